//! AUR registry access
//!
//! Shared HTTP foundation with retry logic plus the RPC v5 adapter.

mod aur;
mod client;

pub use aur::AurClient;
pub use client::HttpClient;

use crate::domain::descriptor::AurPackageInfo;
use crate::error::RegistryError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Trait for the package index backing the reconciler
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetches every package maintained by the given account
    async fn fetch_maintained_packages(
        &self,
        maintainer: &str,
    ) -> Result<Vec<AurPackageInfo>, RegistryError>;
}

/// Builds the name → info lookup used by the reconciler, de-duplicated by
/// pkgbase (split packages share one repository; the first entry wins)
pub fn index_by_name(packages: &[AurPackageInfo]) -> HashMap<String, AurPackageInfo> {
    let mut seen_bases = std::collections::HashSet::new();
    let mut map = HashMap::new();
    for pkg in packages {
        if seen_bases.insert(pkg.pkgbase.clone()) {
            map.insert(pkg.name.clone(), pkg.clone());
        }
    }
    map
}
