//! Registry test utilities

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use stagever::config::Settings;
use stagever::resolve::{ResolveRequest, Resolver};
use stagever::stage::SelectionRequest;
use stagever::version::error::RegistryError;
use stagever::version::registry::Registry;
use stagever::version::types::PackageVersions;
use stagever::version::{SemanticVersion, SourceOptions, VersionRequest, VersioningMode};

/// In-memory registry keyed by source and package id
///
/// Unknown packages list no versions, like an HTTP feed answering 404.
#[derive(Default)]
pub struct MockRegistry {
    versions: HashMap<(String, String), Vec<String>>,
    failing: HashSet<String>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self, source: &str, package_id: &str, versions: Vec<&str>) -> Self {
        self.versions.insert(
            (source.to_string(), package_id.to_lowercase()),
            versions.into_iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Every call against `source` fails
    pub fn with_failure(mut self, source: &str) -> Self {
        self.failing.insert(source.to_string());
        self
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn fetch_all_versions(
        &self,
        source: &str,
        package_id: &str,
    ) -> Result<PackageVersions, RegistryError> {
        if self.failing.contains(source) {
            return Err(RegistryError::InvalidResponse(format!("{} is down", source)));
        }
        let key = (source.to_string(), package_id.to_lowercase());
        Ok(PackageVersions::new(
            self.versions.get(&key).cloned().unwrap_or_default(),
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

/// Create a resolver backed by the given registry and default settings
pub fn create_test_resolver(registry: MockRegistry) -> Resolver {
    Resolver::new(Settings::default(), Arc::new(registry))
}

/// Fixed build time used by label expectations
pub fn build_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 1, 8, 17, 36, 13).unwrap()
}

/// Request with no stage specs configured yet
pub fn create_request(
    package_id: &str,
    base_version: &str,
    trigger: &str,
    mode: VersioningMode,
) -> ResolveRequest {
    ResolveRequest {
        selection: SelectionRequest {
            trigger: trigger.to_string(),
            local_source: "/nonexistent/stagever/local".to_string(),
            ..SelectionRequest::default()
        },
        version: VersionRequest {
            mode,
            ..VersionRequest::new(package_id, base_version, build_time())
        },
        sources: SourceOptions::default(),
        outputs: Vec::new(),
    }
}
