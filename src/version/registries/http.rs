//! HTTP registry client using the flat-container layout
//!
//! `GET {source}/{lowercase-id}/index.json` returns `{"versions": [...]}`.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::semver::SemanticVersion;
use crate::version::types::PackageVersions;

/// Response from a flat-container version index
#[derive(Debug, Deserialize)]
struct VersionIndexResponse {
    #[serde(default)]
    versions: Vec<String>,
}

/// Registry implementation for flat-container HTTP feeds
#[derive(Clone)]
pub struct HttpRegistry {
    client: Client,
}

impl HttpRegistry {
    /// Creates a new HttpRegistry with its own connection pool
    pub fn new() -> Result<Self, RegistryError> {
        let client = Client::builder()
            .user_agent(concat!("stagever/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Creates a new HttpRegistry sharing an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn index_url(source: &str, package_id: &str) -> String {
        format!(
            "{}/{}/index.json",
            source.trim_end_matches('/'),
            package_id.to_lowercase()
        )
    }
}

#[async_trait::async_trait]
impl Registry for HttpRegistry {
    async fn fetch_all_versions(
        &self,
        source: &str,
        package_id: &str,
    ) -> Result<PackageVersions, RegistryError> {
        let url = Self::index_url(source, package_id);
        debug!("Fetching version index: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        // Never published to this feed
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(PackageVersions::default());
        }

        if !status.is_success() {
            warn!("Registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let index: VersionIndexResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse version index {}: {}", url, e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        // Sort versions by precedence (lowest first, highest last)
        let mut versions: Vec<(String, SemanticVersion)> = index
            .versions
            .into_iter()
            .filter_map(|v| v.parse().ok().map(|parsed| (v, parsed)))
            .collect();
        versions.sort_by(|(_, a), (_, b)| a.cmp(b));

        Ok(PackageVersions::new(
            versions.into_iter().map(|(v, _)| v).collect(),
        ))
    }

    async fn version_exists(
        &self,
        source: &str,
        package_id: &str,
        version: &SemanticVersion,
    ) -> Result<bool, RegistryError> {
        let versions = self.fetch_all_versions(source, package_id).await?;
        Ok(versions.contains(version))
    }
}
