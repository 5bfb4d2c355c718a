//! Common version types

use crate::version::semver::{SemanticVersion, parse_version};

/// Versions published for one package at one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersions {
    /// Raw version strings, ordered lowest to highest when the source allows it
    pub versions: Vec<String>,
}

impl PackageVersions {
    pub fn new(versions: Vec<String>) -> Self {
        Self { versions }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Parsed versions; entries that are not valid versions are skipped
    pub fn parsed(&self) -> impl Iterator<Item = SemanticVersion> + '_ {
        self.versions.iter().filter_map(|v| parse_version(v))
    }

    /// Whether the exact version (numeric parts and prerelease) is present
    pub fn contains(&self, version: &SemanticVersion) -> bool {
        self.parsed()
            .any(|v| v.same_release(version) && v.prerelease == version.prerelease)
    }
}
