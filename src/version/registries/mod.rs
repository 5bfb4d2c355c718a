//! Registry implementations for fetching package versions

pub mod http;
pub mod local;

pub use http::HttpRegistry;
pub use local::LocalRegistry;

use std::path::PathBuf;

use reqwest::Url;

use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::semver::SemanticVersion;
use crate::version::types::PackageVersions;

/// Where a source string points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// `http://` or `https://` feed
    Remote(Url),
    /// Directory on the local file system (plain path or `file://` URL)
    Local(PathBuf),
    /// A URL with a scheme no registry implementation handles
    Unsupported(String),
}

impl SourceLocation {
    pub fn classify(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) => match url.scheme() {
                "http" | "https" => SourceLocation::Remote(url),
                "file" => url
                    .to_file_path()
                    .map(SourceLocation::Local)
                    .unwrap_or_else(|_| SourceLocation::Unsupported(source.to_string())),
                // Windows drive letters parse as single-letter schemes
                scheme if scheme.len() == 1 => SourceLocation::Local(PathBuf::from(source)),
                _ => SourceLocation::Unsupported(source.to_string()),
            },
            Err(_) => SourceLocation::Local(PathBuf::from(source)),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceLocation::Remote(_))
    }
}

/// Routes each call to the HTTP or local implementation based on the source
pub struct SourceRegistry {
    http: HttpRegistry,
    local: LocalRegistry,
}

impl SourceRegistry {
    pub fn new(http: HttpRegistry, local: LocalRegistry) -> Self {
        Self { http, local }
    }

    /// Creates a SourceRegistry with a fresh HTTP connection pool
    pub fn with_defaults() -> Result<Self, RegistryError> {
        Ok(Self::new(HttpRegistry::new()?, LocalRegistry::new()))
    }

    fn route(&self, source: &str) -> Result<(&dyn Registry, String), RegistryError> {
        let (registry, location): (&dyn Registry, String) = match SourceLocation::classify(source) {
            SourceLocation::Remote(url) => (&self.http, url.to_string()),
            SourceLocation::Local(path) => (&self.local, path.to_string_lossy().into_owned()),
            SourceLocation::Unsupported(source) => {
                return Err(RegistryError::UnsupportedResource(source));
            }
        };
        Ok((registry, location))
    }
}

#[async_trait::async_trait]
impl Registry for SourceRegistry {
    async fn fetch_all_versions(
        &self,
        source: &str,
        package_id: &str,
    ) -> Result<PackageVersions, RegistryError> {
        let (registry, location) = self.route(source)?;
        registry.fetch_all_versions(&location, package_id).await
    }

    async fn version_exists(
        &self,
        source: &str,
        package_id: &str,
        version: &SemanticVersion,
    ) -> Result<bool, RegistryError> {
        let (registry, location) = self.route(source)?;
        registry.version_exists(&location, package_id, version).await
    }
}
