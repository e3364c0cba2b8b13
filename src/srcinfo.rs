//! SRCINFO generation and parsing
//!
//! PKGBUILDs are shell scripts; evaluating them directly is out of scope.
//! Instead `makepkg --printsrcinfo` renders the metadata as a flat
//! `key = value` stream, which this module parses into a
//! `PackageDescriptor`.

use crate::domain::descriptor::{DescriptorBuilder, PackageDescriptor};
use crate::error::ParseError;
use crate::process::{CommandRunner, CommandSpec};
use crate::scanner::DiscoveredPackage;
use tracing::debug;

/// Produces the descriptor for one discovered package by running
/// `makepkg --printsrcinfo` in its directory
pub fn load_descriptor(
    runner: &dyn CommandRunner,
    package: &DiscoveredPackage,
) -> Result<PackageDescriptor, ParseError> {
    if !package.pkgbuild_path.is_file() {
        return Err(ParseError::not_found(&package.pkgbuild_path));
    }

    let spec = CommandSpec::new("makepkg", &["--printsrcinfo"]).cwd(&package.directory);
    let output = runner
        .run(&spec)
        .map_err(|e| ParseError::srcinfo_failed(&package.pkgbuild_path, e.to_string()))?;
    if !output.success() {
        return Err(ParseError::srcinfo_failed(
            &package.pkgbuild_path,
            output.stderr.trim(),
        ));
    }

    parse_srcinfo(&output.stdout, package)
}

/// Parses SRCINFO text into a descriptor.
///
/// Array keys (pkgname, depends, makedepends, source, sha256sums)
/// accumulate; scalar keys take the first occurrence. Architecture-suffixed
/// keys (`source_x86_64 = ...`) are folded into their base key.
pub fn parse_srcinfo(
    text: &str,
    package: &DiscoveredPackage,
) -> Result<PackageDescriptor, ParseError> {
    let mut builder = DescriptorBuilder::new(&package.pkgbuild_path);
    if let Some(ref config) = package.nvchecker_config {
        builder = builder.nvchecker_config(config);
    }

    let mut seen_pkgver = false;
    let mut seen_pkgrel = false;
    let mut seen_epoch = false;
    let mut seen_pkgbase = false;
    let mut seen_pkgdesc = false;
    let mut seen_url = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            debug!(line, "skipping malformed SRCINFO line");
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let base_key = key.split_once('_').map(|(k, _)| k).unwrap_or(key);

        match base_key {
            "pkgbase" if !seen_pkgbase => {
                builder = builder.pkgbase(value);
                seen_pkgbase = true;
            }
            "pkgname" => builder = builder.pkgname(value),
            "pkgver" if !seen_pkgver => {
                builder = builder.pkgver(value);
                seen_pkgver = true;
            }
            "pkgrel" if !seen_pkgrel => {
                builder = builder.pkgrel(value);
                seen_pkgrel = true;
            }
            "epoch" if !seen_epoch => {
                builder = builder.epoch(value);
                seen_epoch = true;
            }
            "pkgdesc" if !seen_pkgdesc => {
                builder = builder.description(value);
                seen_pkgdesc = true;
            }
            "url" if !seen_url => {
                builder = builder.homepage(value);
                seen_url = true;
            }
            "arch" => builder = builder.architecture(value),
            "license" => builder = builder.license(value),
            "depends" => builder = builder.depend(value),
            "makedepends" => builder = builder.makedepend(value),
            "checkdepends" => builder = builder.checkdepend(value),
            "optdepends" => builder = builder.optdepend(value),
            "provides" => builder = builder.provide(value),
            "conflicts" => builder = builder.conflict(value),
            "replaces" => builder = builder.replace(value),
            "source" => builder = builder.source(value),
            "sha256sums" => builder = builder.sha256sum(value),
            _ => {}
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn discovered() -> DiscoveredPackage {
        DiscoveredPackage {
            directory: PathBuf::from("/ws/pkgs/foo"),
            pkgbuild_path: PathBuf::from("/ws/pkgs/foo/PKGBUILD"),
            nvchecker_config: None,
        }
    }

    const SRCINFO: &str = "\
pkgbase = foo
\tpkgdesc = A sample package
\tpkgver = 1.2.3
\tpkgrel = 2
\turl = https://example.com/foo
\tarch = x86_64
\tarch = aarch64
\tlicense = MIT
\tdepends = glibc
\tdepends = openssl
\tmakedepends = cmake
\tsource = foo-1.2.3.tar.gz::https://example.com/foo-1.2.3.tar.gz
\tsource = foo.service
\tsha256sums = abc123
\tsha256sums = def456

pkgname = foo
";

    #[test]
    fn test_parse_full_srcinfo() {
        let d = parse_srcinfo(SRCINFO, &discovered()).unwrap();
        assert_eq!(d.pkgbase, "foo");
        assert_eq!(d.pkgnames, vec!["foo"]);
        assert_eq!(d.pkgver, "1.2.3");
        assert_eq!(d.pkgrel, "2");
        assert_eq!(d.depends, vec!["glibc", "openssl"]);
        assert_eq!(d.makedepends, vec!["cmake"]);
        assert_eq!(d.sources.len(), 2);
        assert_eq!(d.sha256sums.len(), 2);
        assert!(d.epoch.is_none());
        assert_eq!(d.description.as_deref(), Some("A sample package"));
        assert_eq!(d.homepage.as_deref(), Some("https://example.com/foo"));
        assert_eq!(d.architectures, vec!["x86_64", "aarch64"]);
        assert_eq!(d.licenses, vec!["MIT"]);
    }

    #[test]
    fn test_parse_check_and_relation_arrays() {
        let text = "\
pkgbase = foo
\tpkgver = 1.0
\tcheckdepends = python-pytest
\toptdepends = bash-completion: shell completions
\tprovides = foo-tool
\tconflicts = foo-git
\treplaces = foo-old

pkgname = foo
";
        let d = parse_srcinfo(text, &discovered()).unwrap();
        assert_eq!(d.checkdepends, vec!["python-pytest"]);
        assert_eq!(d.optdepends, vec!["bash-completion: shell completions"]);
        assert_eq!(d.provides, vec!["foo-tool"]);
        assert_eq!(d.conflicts, vec!["foo-git"]);
        assert_eq!(d.replaces, vec!["foo-old"]);
    }

    #[test]
    fn test_parse_split_package() {
        let text = "pkgbase = bar\n\tpkgver = 2.0\n\tpkgrel = 1\n\npkgname = bar-cli\n\npkgname = bar-docs\n";
        let d = parse_srcinfo(text, &discovered()).unwrap();
        assert_eq!(d.pkgbase, "bar");
        assert_eq!(d.pkgnames, vec!["bar-cli", "bar-docs"]);
    }

    #[test]
    fn test_parse_missing_pkgname_is_error() {
        let text = "pkgbase = foo\n\tpkgver = 1.0\n";
        let err = parse_srcinfo(text, &discovered()).unwrap_err();
        assert!(format!("{}", err).contains("pkgname"));
    }

    #[test]
    fn test_parse_epoch() {
        let text = "pkgbase = foo\n\tpkgver = 1.0\n\tpkgrel = 3\n\tepoch = 2\n\npkgname = foo\n";
        let d = parse_srcinfo(text, &discovered()).unwrap();
        assert_eq!(d.epoch.as_deref(), Some("2"));
        assert_eq!(format!("{}", d.version()), "2:1.0-3");
    }

    #[test]
    fn test_parse_arch_suffixed_source_folds_in() {
        let text =
            "pkgbase = foo\n\tpkgver = 1.0\n\tsource_x86_64 = foo-x86_64.bin\n\npkgname = foo\n";
        let d = parse_srcinfo(text, &discovered()).unwrap();
        assert_eq!(d.sources, vec!["foo-x86_64.bin"]);
    }

    #[test]
    fn test_parse_tolerates_malformed_lines() {
        let text = "garbage line\npkgbase = foo\n\tpkgver = 1.0\n\npkgname = foo\n";
        let d = parse_srcinfo(text, &discovered()).unwrap();
        assert_eq!(d.pkgbase, "foo");
    }

    #[test]
    fn test_pkgbase_falls_back_to_pkgname() {
        let text = "pkgname = solo\npkgver = 0.1\n";
        let d = parse_srcinfo(text, &discovered()).unwrap();
        assert_eq!(d.pkgbase, "solo");
        assert_eq!(d.pkgrel, "1");
    }

    #[test]
    fn test_nvchecker_config_carried_through() {
        let mut pkg = discovered();
        pkg.nvchecker_config = Some(PathBuf::from("/ws/pkgs/foo/.nvchecker.toml"));
        let d = parse_srcinfo(SRCINFO, &pkg).unwrap();
        assert!(d.nvchecker_config.is_some());
    }
}
