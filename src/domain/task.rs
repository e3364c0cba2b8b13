//! Update tasks produced by the reconciler

use crate::domain::descriptor::{AurPackageInfo, PackageDescriptor};
use crate::domain::version::PkgVersion;
use serde::{Deserialize, Serialize};

/// One unit of work for the package processor: a package whose published
/// state is behind either upstream or the local descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    /// Local build descriptor
    pub descriptor: PackageDescriptor,
    /// Matching AUR index entry; absent for a package not yet published
    pub aur_info: Option<AurPackageInfo>,
    /// Upstream target version reported by the global check, when any
    pub target_pkgver: Option<String>,
}

impl UpdateTask {
    /// Package name this task is keyed by
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Version of the local descriptor at reconciliation time
    pub fn current_version(&self) -> PkgVersion {
        self.descriptor.version()
    }
}
