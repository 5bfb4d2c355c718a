//! Registry trait for fetching published package versions

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::semver::SemanticVersion;
use crate::version::types::PackageVersions;

/// Trait for querying package versions at a registry location
///
/// A single implementation may serve many locations; the location is passed
/// with every call. Implementations must tolerate concurrent use.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches all published versions of a package at the given source
    ///
    /// # Arguments
    /// * `source` - Registry location (URL or local directory)
    /// * `package_id` - The package identifier
    ///
    /// # Returns
    /// * `Ok(PackageVersions)` - Published versions, ordered lowest to highest;
    ///   empty when the package has never been published there
    /// * `Err(RegistryError)` - If the source cannot be queried
    async fn fetch_all_versions(
        &self,
        source: &str,
        package_id: &str,
    ) -> Result<PackageVersions, RegistryError>;

    /// Checks whether exactly this version is published at the given source
    async fn version_exists(
        &self,
        source: &str,
        package_id: &str,
        version: &SemanticVersion,
    ) -> Result<bool, RegistryError>;
}
