//! Arch package version handling
//!
//! A full package version is `[epoch:]pkgver-pkgrel`, e.g. `2:3.4.5-6`.
//! Upstream version strings usually carry no pkgrel; parsing defaults it
//! to "1" in that case.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A composite Arch package version: epoch, pkgver, pkgrel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkgVersion {
    /// Optional epoch (the prefix before the first `:`)
    pub epoch: Option<String>,
    /// Upstream version component
    pub pkgver: String,
    /// Package release counter
    pub pkgrel: String,
}

impl PkgVersion {
    /// Creates a new PkgVersion without an epoch
    pub fn new(pkgver: impl Into<String>, pkgrel: impl Into<String>) -> Self {
        Self {
            epoch: None,
            pkgver: pkgver.into(),
            pkgrel: pkgrel.into(),
        }
    }

    /// Creates a new PkgVersion with an epoch
    pub fn with_epoch(mut self, epoch: impl Into<String>) -> Self {
        self.epoch = Some(epoch.into());
        self
    }

    /// Parses a version string like `epoch:pkgver-pkgrel` or `pkgver-pkgrel`.
    ///
    /// Never fails: a bare string with no release separator is treated as
    /// pkgver with pkgrel "1". The pkgrel is whatever follows the *last*
    /// hyphen, so hyphenated pkgvers split correctly only when a plain
    /// release segment follows. This convention-based default is deliberate;
    /// do not try to guess harder.
    pub fn parse(version_string: &str) -> Self {
        let (epoch, rest) = match version_string.split_once(':') {
            Some((e, r)) => (Some(e.to_string()), r),
            None => (None, version_string),
        };

        match rest.rsplit_once('-') {
            Some((pkgver, pkgrel)) if !pkgver.is_empty() && !pkgrel.is_empty() => Self {
                epoch,
                pkgver: pkgver.to_string(),
                pkgrel: pkgrel.to_string(),
            },
            _ => Self {
                epoch,
                pkgver: rest.to_string(),
                pkgrel: "1".to_string(),
            },
        }
    }
}

impl fmt::Display for PkgVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref epoch) = self.epoch {
            write!(f, "{}:", epoch)?;
        }
        write!(f, "{}-{}", self.pkgver, self.pkgrel)
    }
}
