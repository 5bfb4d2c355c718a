//! Four-part semantic versions
//!
//! `major.minor.patch[.revision][-prerelease][+metadata]`. Prerelease and
//! metadata identifiers follow semver rules and reuse the `semver` crate types,
//! which also gives prerelease precedence ordering for free.

use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease};

use crate::version::error::VersionError;

/// Immutable semantic version with an optional fourth (revision) component
///
/// Ordering compares the numeric parts first (an absent revision sorts before
/// any present one), then prerelease precedence (a release sorts after its
/// prereleases), then metadata as a final tiebreak.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: Option<u64>,
    pub prerelease: Prerelease,
    pub metadata: BuildMetadata,
}

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: None,
            prerelease: Prerelease::EMPTY,
            metadata: BuildMetadata::EMPTY,
        }
    }

    pub fn with_revision(mut self, revision: Option<u64>) -> Self {
        self.revision = revision;
        self
    }

    /// Replaces the prerelease label; an empty string clears it
    pub fn with_prerelease(mut self, label: &str) -> Result<Self, VersionError> {
        self.prerelease = Prerelease::new(label)
            .map_err(|e| VersionError::InvalidLabel(format!("'{}': {}", label, e)))?;
        Ok(self)
    }

    /// Replaces the metadata segment; an empty string clears it
    pub fn with_metadata(mut self, metadata: &str) -> Result<Self, VersionError> {
        self.metadata = BuildMetadata::new(metadata)
            .map_err(|e| VersionError::InvalidLabel(format!("'{}': {}", metadata, e)))?;
        Ok(self)
    }

    /// Numeric components only, no prerelease or metadata
    pub fn release(&self) -> Self {
        Self::new(self.major, self.minor, self.patch).with_revision(self.revision)
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Version text without the metadata segment
    pub fn normalized(&self) -> String {
        let mut text = self.numeric();
        if !self.prerelease.is_empty() {
            text.push('-');
            text.push_str(self.prerelease.as_str());
        }
        text
    }

    /// `major.minor.patch[.revision]`
    pub fn numeric(&self) -> String {
        match self.revision {
            Some(revision) => format!("{}.{}.{}.{}", self.major, self.minor, self.patch, revision),
            None => format!("{}.{}.{}", self.major, self.minor, self.patch),
        }
    }

    /// Whether both versions share the same numeric components
    ///
    /// An absent revision and a zero revision are considered the same release.
    pub fn same_release(&self, other: &SemanticVersion) -> bool {
        self.major == other.major
            && self.minor == other.minor
            && self.patch == other.patch
            && self.revision.unwrap_or(0) == other.revision.unwrap_or(0)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())?;
        if !self.metadata.is_empty() {
            write!(f, "+{}", self.metadata)?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    /// Parses a version, padding partial versions like "1" or "1.2" with zeros
    ///
    /// A leading `v` is accepted and ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::InvalidVersion(s.to_string());

        let text = s.trim();
        let text = text.strip_prefix(['v', 'V']).unwrap_or(text);
        let (text, metadata) = match text.split_once('+') {
            Some((rest, metadata)) => (rest, metadata),
            None => (text, ""),
        };
        let (numeric, prerelease) = match text.split_once('-') {
            Some((numeric, prerelease)) => (numeric, prerelease),
            None => (text, ""),
        };

        let parts = numeric
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (major, minor, patch, revision) = match parts.as_slice() {
            [major] => (*major, 0, 0, None),
            [major, minor] => (*major, *minor, 0, None),
            [major, minor, patch] => (*major, *minor, *patch, None),
            [major, minor, patch, revision] => (*major, *minor, *patch, Some(*revision)),
            _ => return Err(invalid()),
        };

        if text.ends_with('-') || s.trim_end().ends_with('+') {
            return Err(invalid());
        }

        let prerelease = Prerelease::new(prerelease).map_err(|_| invalid())?;
        let metadata = BuildMetadata::new(metadata).map_err(|_| invalid())?;

        Ok(Self {
            major,
            minor,
            patch,
            revision,
            prerelease,
            metadata,
        })
    }
}

/// Parse a version string, returning `None` when it is not a valid version
pub fn parse_version(version: &str) -> Option<SemanticVersion> {
    version.parse().ok()
}
