//! Local directory feed
//!
//! Versions are discovered from two layouts, both matched case-insensitively
//! on the package id:
//! - hierarchical: `<dir>/<id>/<version>/`
//! - flat: `<dir>/<id>.<version>.nupkg`

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::semver::{SemanticVersion, parse_version};
use crate::version::types::PackageVersions;

const PACKAGE_EXTENSION: &str = ".nupkg";

/// Version part of a flat `<id>.<version>.nupkg` file name, keeping its case
fn flat_package_version<'a>(file_name: &'a str, package_id: &str) -> Option<&'a str> {
    let id = file_name.get(..package_id.len())?;
    if !id.eq_ignore_ascii_case(package_id) {
        return None;
    }
    let rest = file_name.get(package_id.len()..)?.strip_prefix('.')?;
    let split = rest.len().checked_sub(PACKAGE_EXTENSION.len())?;
    let extension = rest.get(split..)?;
    extension
        .eq_ignore_ascii_case(PACKAGE_EXTENSION)
        .then(|| rest.get(..split))
        .flatten()
}

/// Registry implementation for directories on the local file system
#[derive(Debug, Clone, Default)]
pub struct LocalRegistry;

impl LocalRegistry {
    pub fn new() -> Self {
        Self
    }

    async fn scan(&self, dir: &Path, package_id: &str) -> Result<Vec<String>, RegistryError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Local feed {:?} does not exist", dir);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() && name.eq_ignore_ascii_case(package_id) {
                versions.extend(self.scan_package_dir(&entry.path()).await?);
            } else if file_type.is_file()
                && let Some(version) = flat_package_version(&name, package_id)
                && parse_version(version).is_some()
            {
                versions.push(version.to_string());
            }
        }

        Ok(versions)
    }

    async fn scan_package_dir(&self, dir: &Path) -> Result<Vec<String>, RegistryError> {
        let mut entries = fs::read_dir(dir).await?;
        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if parse_version(&name).is_some() {
                versions.push(name);
            }
        }
        Ok(versions)
    }
}

#[async_trait::async_trait]
impl Registry for LocalRegistry {
    async fn fetch_all_versions(
        &self,
        source: &str,
        package_id: &str,
    ) -> Result<PackageVersions, RegistryError> {
        let mut versions: Vec<(String, SemanticVersion)> = self
            .scan(Path::new(source), package_id)
            .await?
            .into_iter()
            .filter_map(|v| parse_version(&v).map(|parsed| (v, parsed)))
            .collect();
        versions.sort_by(|(_, a), (_, b)| a.cmp(b));
        versions.dedup_by(|(a, _), (b, _)| a == b);

        debug!(
            "Found {} versions of {} in {}",
            versions.len(),
            package_id,
            source
        );
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
