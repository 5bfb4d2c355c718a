//! Versioning policy

use std::fmt;
use std::str::FromStr;

use crate::version::error::VersionError;

/// Policy governing how the version number changes between builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersioningMode {
    /// Next patch after the highest published `major.minor.*`
    #[default]
    AutomaticLatestPatch,
    /// Next revision after the highest published `major.minor.patch.*`
    AutomaticLatestRevision,
    /// Bump the patch of prereleases whose stable version is already published
    IncrementPatchIfStableExistForPrerelease,
    /// Always bump the patch
    AlwaysIncrementPatch,
    /// Keep the numeric components of the base version
    NoChange,
}

impl VersioningMode {
    pub const ALL: [VersioningMode; 5] = [
        VersioningMode::AutomaticLatestPatch,
        VersioningMode::AutomaticLatestRevision,
        VersioningMode::IncrementPatchIfStableExistForPrerelease,
        VersioningMode::AlwaysIncrementPatch,
        VersioningMode::NoChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VersioningMode::AutomaticLatestPatch => "AutomaticLatestPatch",
            VersioningMode::AutomaticLatestRevision => "AutomaticLatestRevision",
            VersioningMode::IncrementPatchIfStableExistForPrerelease => {
                "IncrementPatchIfStableExistForPrerelease"
            }
            VersioningMode::AlwaysIncrementPatch => "AlwaysIncrementPatch",
            VersioningMode::NoChange => "NoChange",
        }
    }

    /// Whether this mode consults published versions across all sources
    pub fn is_automatic(&self) -> bool {
        matches!(
            self,
            VersioningMode::AutomaticLatestPatch | VersioningMode::AutomaticLatestRevision
        )
    }
}

impl fmt::Display for VersioningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersioningMode {
    type Err = VersionError;

    /// Case-insensitive; unknown names are reported instead of defaulted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        VersioningMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| VersionError::UnknownMode(s.to_string()))
    }
}
