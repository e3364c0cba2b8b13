//! Package build descriptors and AUR index entries

use crate::domain::version::PkgVersion;
use crate::error::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Structured metadata for one PKGBUILD, as reported by `.SRCINFO`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Directory containing the PKGBUILD
    pub directory: PathBuf,
    /// Path to the PKGBUILD file itself
    pub pkgbuild_path: PathBuf,
    /// pkgbase (falls back to the first pkgname)
    pub pkgbase: String,
    /// All pkgname entries (at least one)
    pub pkgnames: Vec<String>,
    /// Upstream version component
    pub pkgver: String,
    /// Release counter
    pub pkgrel: String,
    /// Optional epoch
    pub epoch: Option<String>,
    /// pkgdesc
    pub description: Option<String>,
    /// url
    pub homepage: Option<String>,
    /// arch entries
    pub architectures: Vec<String>,
    /// license entries
    pub licenses: Vec<String>,
    /// depends entries
    pub depends: Vec<String>,
    /// makedepends entries
    pub makedepends: Vec<String>,
    /// checkdepends entries
    pub checkdepends: Vec<String>,
    /// optdepends entries
    pub optdepends: Vec<String>,
    /// provides entries
    pub provides: Vec<String>,
    /// conflicts entries
    pub conflicts: Vec<String>,
    /// replaces entries
    pub replaces: Vec<String>,
    /// source array entries
    pub sources: Vec<String>,
    /// sha256sums array entries
    pub sha256sums: Vec<String>,
    /// Sibling `.nvchecker.toml`, when present
    pub nvchecker_config: Option<PathBuf>,
}

impl PackageDescriptor {
    /// First pkgname; primary identity of the package
    pub fn name(&self) -> &str {
        &self.pkgnames[0]
    }

    /// Current full version of this descriptor
    pub fn version(&self) -> PkgVersion {
        PkgVersion {
            epoch: self.epoch.clone(),
            pkgver: self.pkgver.clone(),
            pkgrel: self.pkgrel.clone(),
        }
    }
}

/// Builder validating the mandatory descriptor fields
#[derive(Debug, Default)]
pub struct DescriptorBuilder {
    directory: PathBuf,
    pkgbuild_path: PathBuf,
    pkgbase: Option<String>,
    pkgnames: Vec<String>,
    pkgver: Option<String>,
    pkgrel: Option<String>,
    epoch: Option<String>,
    description: Option<String>,
    homepage: Option<String>,
    architectures: Vec<String>,
    licenses: Vec<String>,
    depends: Vec<String>,
    makedepends: Vec<String>,
    checkdepends: Vec<String>,
    optdepends: Vec<String>,
    provides: Vec<String>,
    conflicts: Vec<String>,
    replaces: Vec<String>,
    sources: Vec<String>,
    sha256sums: Vec<String>,
    nvchecker_config: Option<PathBuf>,
}

impl DescriptorBuilder {
    /// Creates a builder for the PKGBUILD at the given path
    pub fn new(pkgbuild_path: impl Into<PathBuf>) -> Self {
        let pkgbuild_path = pkgbuild_path.into();
        let directory = pkgbuild_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        Self {
            directory,
            pkgbuild_path,
            ..Default::default()
        }
    }

    pub fn pkgbase(mut self, pkgbase: impl Into<String>) -> Self {
        self.pkgbase = Some(pkgbase.into());
        self
    }

    pub fn pkgname(mut self, name: impl Into<String>) -> Self {
        self.pkgnames.push(name.into());
        self
    }

    pub fn pkgver(mut self, pkgver: impl Into<String>) -> Self {
        self.pkgver = Some(pkgver.into());
        self
    }

    pub fn pkgrel(mut self, pkgrel: impl Into<String>) -> Self {
        self.pkgrel = Some(pkgrel.into());
        self
    }

    pub fn epoch(mut self, epoch: impl Into<String>) -> Self {
        self.epoch = Some(epoch.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = Some(homepage.into());
        self
    }

    pub fn architecture(mut self, arch: impl Into<String>) -> Self {
        self.architectures.push(arch.into());
        self
    }

    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.licenses.push(license.into());
        self
    }

    pub fn depend(mut self, dep: impl Into<String>) -> Self {
        self.depends.push(dep.into());
        self
    }

    pub fn makedepend(mut self, dep: impl Into<String>) -> Self {
        self.makedepends.push(dep.into());
        self
    }

    pub fn checkdepend(mut self, dep: impl Into<String>) -> Self {
        self.checkdepends.push(dep.into());
        self
    }

    pub fn optdepend(mut self, dep: impl Into<String>) -> Self {
        self.optdepends.push(dep.into());
        self
    }

    pub fn provide(mut self, entry: impl Into<String>) -> Self {
        self.provides.push(entry.into());
        self
    }

    pub fn conflict(mut self, entry: impl Into<String>) -> Self {
        self.conflicts.push(entry.into());
        self
    }

    pub fn replace(mut self, entry: impl Into<String>) -> Self {
        self.replaces.push(entry.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn sha256sum(mut self, sum: impl Into<String>) -> Self {
        self.sha256sums.push(sum.into());
        self
    }

    pub fn nvchecker_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.nvchecker_config = Some(path.into());
        self
    }

    /// Finalizes the descriptor.
    ///
    /// Requires at least one pkgname and a pkgver; pkgbase falls back to the
    /// first pkgname and pkgrel to "1".
    pub fn build(self) -> Result<PackageDescriptor, ParseError> {
        if self.pkgnames.is_empty() {
            return Err(ParseError::missing_field(&self.pkgbuild_path, "pkgname"));
        }
        let pkgver = self
            .pkgver
            .ok_or_else(|| ParseError::missing_field(&self.pkgbuild_path, "pkgver"))?;
        let pkgbase = self
            .pkgbase
            .unwrap_or_else(|| self.pkgnames[0].clone());
        Ok(PackageDescriptor {
            directory: self.directory,
            pkgbuild_path: self.pkgbuild_path,
            pkgbase,
            pkgnames: self.pkgnames,
            pkgver,
            pkgrel: self.pkgrel.unwrap_or_else(|| "1".to_string()),
            epoch: self.epoch,
            description: self.description,
            homepage: self.homepage,
            architectures: self.architectures,
            licenses: self.licenses,
            depends: self.depends,
            makedepends: self.makedepends,
            checkdepends: self.checkdepends,
            optdepends: self.optdepends,
            provides: self.provides,
            conflicts: self.conflicts,
            replaces: self.replaces,
            sources: self.sources,
            sha256sums: self.sha256sums,
            nvchecker_config: self.nvchecker_config,
        })
    }
}

/// One package entry from the AUR RPC maintainer search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AurPackageInfo {
    /// PackageBase (the AUR git repository name)
    pub pkgbase: String,
    /// Package name
    pub name: String,
    /// Full version string as published on the AUR
    pub version: PkgVersion,
    /// Current maintainer, if any
    pub maintainer: Option<String>,
    /// Numeric AUR package id
    pub id: Option<u64>,
    /// Vote count
    pub votes: Option<u64>,
    /// Popularity score
    pub popularity: Option<f64>,
    /// Last modification time
    pub last_modified: Option<DateTime<Utc>>,
}
