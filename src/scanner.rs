//! Workspace discovery: locate PKGBUILD files and their checker configs

use crate::error::IoError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A PKGBUILD found on disk, paired with its optional sibling
/// `.nvchecker.toml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPackage {
    /// Directory containing the PKGBUILD
    pub directory: PathBuf,
    /// Full path to the PKGBUILD
    pub pkgbuild_path: PathBuf,
    /// Path to `.nvchecker.toml` next to the PKGBUILD, when present
    pub nvchecker_config: Option<PathBuf>,
}

/// Recursively finds every `PKGBUILD` under `root`, sorted by path for
/// deterministic processing order.
///
/// Hidden directories (dot-prefixed) are skipped; an AUR workspace keeps
/// its packages in plain directories and `.git` trees would only add noise.
pub fn discover_packages(root: &Path) -> Result<Vec<DiscoveredPackage>, IoError> {
    let mut found = Vec::new();
    walk(root, &mut found)?;
    found.sort_by(|a, b| a.pkgbuild_path.cmp(&b.pkgbuild_path));
    info!(count = found.len(), root = %root.display(), "discovered PKGBUILD files");
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<DiscoveredPackage>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(|e| IoError::generic(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| IoError::generic(dir, e))?;
        let path = entry.path();
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if path.is_dir() {
            if name.starts_with('.') {
                continue;
            }
            walk(&path, found)?;
        } else if name == "PKGBUILD" {
            let nvchecker = path.parent().map(|p| p.join(".nvchecker.toml"));
            let nvchecker_config = nvchecker.filter(|p| p.is_file());
            debug!(pkgbuild = %path.display(), has_checker_config = nvchecker_config.is_some(), "found package");
            found.push(DiscoveredPackage {
                directory: path.parent().map(PathBuf::from).unwrap_or_default(),
                pkgbuild_path: path,
                nvchecker_config,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_package(root: &Path, name: &str, with_checker: bool) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("PKGBUILD"), "pkgname=x\npkgver=1\n").unwrap();
        if with_checker {
            fs::write(dir.join(".nvchecker.toml"), "[x]\nsource = \"github\"\n").unwrap();
        }
    }

    #[test]
    fn test_discovers_sorted() {
        let tmp = TempDir::new().unwrap();
        make_package(tmp.path(), "zeta", false);
        make_package(tmp.path(), "alpha", false);
        let found = discover_packages(tmp.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].pkgbuild_path.ends_with("alpha/PKGBUILD"));
        assert!(found[1].pkgbuild_path.ends_with("zeta/PKGBUILD"));
    }

    #[test]
    fn test_pairs_nvchecker_config() {
        let tmp = TempDir::new().unwrap();
        make_package(tmp.path(), "foo", true);
        make_package(tmp.path(), "bar", false);
        let found = discover_packages(tmp.path()).unwrap();
        let foo = found.iter().find(|p| p.directory.ends_with("foo")).unwrap();
        let bar = found.iter().find(|p| p.directory.ends_with("bar")).unwrap();
        assert!(foo.nvchecker_config.is_some());
        assert!(bar.nvchecker_config.is_none());
    }

    #[test]
    fn test_recurses_into_subdirectories() {
        let tmp = TempDir::new().unwrap();
        make_package(&tmp.path().join("group"), "nested", false);
        let found = discover_packages(tmp.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].pkgbuild_path.ends_with("group/nested/PKGBUILD"));
    }

    #[test]
    fn test_skips_hidden_directories() {
        let tmp = TempDir::new().unwrap();
        make_package(&tmp.path().join(".git"), "stale", false);
        make_package(tmp.path(), "real", false);
        let found = discover_packages(tmp.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].directory.ends_with("real"));
    }

    #[test]
    fn test_empty_workspace() {
        let tmp = TempDir::new().unwrap();
        let found = discover_packages(tmp.path()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_root_is_error() {
        let err = discover_packages(Path::new("/nonexistent/path/xyz")).unwrap_err();
        assert!(format!("{}", err).contains("IO error"));
    }
}
