//! AUR RPC v5 adapter
//!
//! Fetches every package maintained by a given account:
//! `GET https://aur.archlinux.org/rpc/v5/search/{maintainer}?by=maintainer`

use crate::domain::descriptor::AurPackageInfo;
use crate::domain::version::PkgVersion;
use crate::error::RegistryError;
use crate::registry::{HttpClient, RegistryClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

/// AUR RPC base URL
const AUR_RPC_URL: &str = "https://aur.archlinux.org/rpc/v5";

/// AUR RPC client
pub struct AurClient {
    client: HttpClient,
    base_url: String,
}

/// Top-level RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(rename = "type")]
    response_type: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Vec<RpcPackage>,
}

/// One package record in an RPC search result
#[derive(Debug, Deserialize)]
struct RpcPackage {
    #[serde(rename = "PackageBase")]
    package_base: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Version")]
    version: Option<String>,
    #[serde(rename = "Maintainer")]
    maintainer: Option<String>,
    #[serde(rename = "ID")]
    id: Option<u64>,
    #[serde(rename = "NumVotes")]
    num_votes: Option<u64>,
    #[serde(rename = "Popularity")]
    popularity: Option<f64>,
    #[serde(rename = "LastModified")]
    last_modified: Option<i64>,
}

impl AurClient {
    /// Creates a new AUR client over the shared HTTP foundation
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: AUR_RPC_URL.to_string(),
        }
    }

    /// Overrides the RPC base URL (tests)
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_url(&self, maintainer: &str) -> String {
        format!("{}/search/{}?by=maintainer", self.base_url, maintainer)
    }
}

#[async_trait]
impl RegistryClient for AurClient {
    async fn fetch_maintained_packages(
        &self,
        maintainer: &str,
    ) -> Result<Vec<AurPackageInfo>, RegistryError> {
        let url = self.build_url(maintainer);
        let response: RpcResponse = self.client.get_json(&url, maintainer).await?;

        if response.response_type == "error" {
            return Err(RegistryError::invalid_response(
                maintainer,
                response.error.unwrap_or_else(|| "unspecified RPC error".to_string()),
            ));
        }

        let mut packages = Vec::new();
        for entry in response.results {
            let (Some(pkgbase), Some(name), Some(version)) =
                (entry.package_base, entry.name, entry.version)
            else {
                warn!("skipping AUR entry with missing PackageBase/Name/Version");
                continue;
            };
            packages.push(AurPackageInfo {
                pkgbase,
                name,
                version: PkgVersion::parse(&version),
                maintainer: entry.maintainer,
                id: entry.id,
                votes: entry.num_votes,
                popularity: entry.popularity,
                last_modified: entry
                    .last_modified
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            });
        }

        debug!(maintainer, count = packages.len(), "fetched AUR packages");
        Ok(packages)
    }
}
