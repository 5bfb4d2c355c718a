//! Package version computation
//!
//! Combines the base version, the versioning mode, published versions and
//! the selected stage into the version a build is published under.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::stage::SelectedStage;
use crate::template::{NamedArguments, format};
use crate::version::error::VersionError;
use crate::version::label::{LabelContext, normalize_label, render_metadata, render_prerelease};
use crate::version::lookup::{LatestVersionQuery, find_latest_version, version_exists_at};
use crate::version::mode::VersioningMode;
use crate::version::registry::Registry;
use crate::version::semver::{SemanticVersion, parse_version};

/// Inputs describing one package to version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequest {
    pub package_id: String,
    pub base_version: String,
    /// Template over `{Major}/{Minor}/{Patch}/{Revision}` returned as-is when it parses
    pub force_version: Option<String>,
    /// Template over the same placeholders replacing the base version
    pub version_format: Option<String>,
    pub mode: VersioningMode,
    pub metadata: Option<String>,
    pub metadata_format: Option<String>,
    pub parameter: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VersionRequest {
    pub fn new(package_id: &str, base_version: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            package_id: package_id.to_string(),
            base_version: base_version.to_string(),
            force_version: None,
            version_format: None,
            mode: VersioningMode::default(),
            metadata: None,
            metadata_format: None,
            parameter: None,
            timestamp,
        }
    }
}

/// Substitute the numeric components of `base` into a version template
///
/// Returns `None` when the rendered text is not a version.
fn apply_version_template(
    template: &str,
    base: &SemanticVersion,
) -> Result<Option<SemanticVersion>, VersionError> {
    let args = NamedArguments::new()
        .with("Major", base.major)
        .with("Minor", base.minor)
        .with("Patch", base.patch)
        .with("Revision", base.revision.unwrap_or(0));
    let text = format(template, &args)?.into_strict()?;

    let version = parse_version(&text);
    if version.is_none() {
        debug!("Version template '{}' rendered '{}', not a version", template, text);
    }
    Ok(version)
}

/// `value + 1`, or an error naming `version` when the component is exhausted
fn increment(value: u64, version: &SemanticVersion) -> Result<u64, VersionError> {
    value
        .checked_add(1)
        .ok_or_else(|| VersionError::InvalidVersion(format!("{} cannot be incremented", version)))
}

pub struct PackageVersioner {
    registry: Arc<dyn Registry>,
    timeout_ms: u64,
}

impl PackageVersioner {
    pub fn new(registry: Arc<dyn Registry>, timeout_ms: u64) -> Self {
        Self {
            registry,
            timeout_ms,
        }
    }

    /// Compute the version for a package published to the selected stage
    ///
    /// `sources` is the aggregated list queried by the automatic modes.
    pub async fn compute(
        &self,
        request: &VersionRequest,
        selected: &SelectedStage,
        sources: &[String],
    ) -> Result<SemanticVersion, VersionError> {
        let base: SemanticVersion = request.base_version.parse()?;

        if let Some(template) = &request.force_version
            && let Some(forced) = apply_version_template(template, &base)?
        {
            info!("Using forced version {} for {}", forced, request.package_id);
            return Ok(forced);
        }

        let (base, mode) = match &request.version_format {
            Some(template) => match apply_version_template(template, &base)? {
                Some(reformatted) => {
                    debug!("Base version of {} reformatted to {}", request.package_id, reformatted);
                    (reformatted, VersioningMode::NoChange)
                }
                None => (base, request.mode),
            },
            None => (base, request.mode),
        };

        let stage = &selected.stage;
        let metadata = if base.metadata.is_empty() {
            request.metadata.clone()
        } else {
            Some(base.metadata.to_string())
        };
        let context = LabelContext {
            version_stage: &stage.version_stage,
            timestamp: request.timestamp,
            prefix: &selected.prefix,
            postfix: &selected.postfix,
            metadata: metadata.as_deref(),
            parameter: request.parameter.as_deref(),
        };

        let metadata = match (&request.metadata_format, &metadata) {
            (Some(template), _) => render_metadata(template, &context)?,
            (None, Some(metadata)) => normalize_label(metadata),
            (None, None) => String::new(),
        };

        let release = self.apply_mode(mode, &base, request, selected, sources).await?;
        let mut version = release.with_metadata(&metadata)?;

        if !stage.is_stable {
            let mut label = render_prerelease(stage.prerelease_format.as_deref(), &context)?;
            if label.is_empty() {
                debug!("Prerelease format of stage {} rendered empty, using default", stage.name);
                label = render_prerelease(None, &context)?;
            }
            version = version.with_prerelease(&label)?;
        }

        info!(
            "{} {} ({}) on stage {}: {}",
            request.package_id, base, mode, stage.name, version
        );
        Ok(version)
    }

    /// Numeric components for the mode, without prerelease or metadata
    async fn apply_mode(
        &self,
        mode: VersioningMode,
        base: &SemanticVersion,
        request: &VersionRequest,
        selected: &SelectedStage,
        sources: &[String],
    ) -> Result<SemanticVersion, VersionError> {
        let release = base.release();
        let stage = &selected.stage;

        match mode {
            VersioningMode::AutomaticLatestPatch => {
                let query = LatestVersionQuery {
                    package_id: &request.package_id,
                    major: base.major,
                    minor: base.minor,
                    patch: None,
                    include_prerelease: !stage.is_stable,
                };
                match self.latest(sources, &query).await {
                    Some(latest) => Ok(SemanticVersion::new(
                        base.major,
                        base.minor,
                        increment(latest.patch, &latest)?,
                    )),
                    None => Ok(release),
                }
            }
            VersioningMode::AutomaticLatestRevision => {
                let query = LatestVersionQuery {
                    package_id: &request.package_id,
                    major: base.major,
                    minor: base.minor,
                    patch: Some(base.patch),
                    include_prerelease: !stage.is_stable,
                };
                match self.latest(sources, &query).await {
                    Some(latest) => {
                        let revision = increment(latest.revision.unwrap_or(0), &latest)?;
                        Ok(release.with_revision(Some(revision)))
                    }
                    None => Ok(release),
                }
            }
            VersioningMode::IncrementPatchIfStableExistForPrerelease => {
                if stage.is_stable {
                    return Ok(release);
                }
                let exists = version_exists_at(
                    self.registry.as_ref(),
                    &stage.feed_source,
                    &request.package_id,
                    &release,
                    self.timeout_ms,
                )
                .await;
                if exists {
                    debug!("{} {} already published, bumping patch", request.package_id, release);
                    let patch = increment(base.patch, base)?;
                    Ok(SemanticVersion::new(base.major, base.minor, patch))
                } else {
                    Ok(release)
                }
            }
            VersioningMode::AlwaysIncrementPatch => Ok(SemanticVersion::new(
                base.major,
                base.minor,
                increment(base.patch, base)?,
            )),
            VersioningMode::NoChange => Ok(release),
        }
    }

    async fn latest(
        &self,
        sources: &[String],
        query: &LatestVersionQuery<'_>,
    ) -> Option<SemanticVersion> {
        find_latest_version(self.registry.as_ref(), sources, query, self.timeout_ms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{SelectedStage, Stage};
    use crate::version::error::RegistryError;
    use crate::version::registry::MockRegistry;
    use crate::version::types::PackageVersions;
    use chrono::TimeZone;
    use regex::Regex;

    const FEED: &str = "https://ci.feed";

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 1, 8, 17, 36, 13).unwrap()
    }

    fn stage(version_stage: &str, is_stable: bool) -> SelectedStage {
        let stage = Stage::new("integration", version_stage, is_stable, Regex::new(".+").unwrap(), FEED);
        SelectedStage::new(stage, None, None)
    }

    fn request(base: &str, mode: VersioningMode) -> VersionRequest {
        VersionRequest {
            mode,
            ..VersionRequest::new("My.Package", base, timestamp())
        }
    }

    fn versioner(registry: MockRegistry) -> PackageVersioner {
        PackageVersioner::new(Arc::new(registry), 1_000)
    }

    fn published(list: &'static [&'static str]) -> MockRegistry {
        let mut registry = MockRegistry::new();
        registry.expect_fetch_all_versions().returning(move |_, _| {
            Ok(PackageVersions::new(list.iter().map(|v| v.to_string()).collect()))
        });
        registry
    }

    fn sources() -> Vec<String> {
        vec![FEED.to_string()]
    }

    #[tokio::test]
    async fn no_change_appends_default_label() {
        let version = versioner(MockRegistry::new())
            .compute(&request("1.0.1", VersioningMode::NoChange), &stage("dev", false), &sources())
            .await
            .unwrap();

        assert_eq!(version.normalized(), "1.0.1-u20160108-173613-dev");
    }

    #[tokio::test]
    async fn always_increment_patch_bumps_patch() {
        let version = versioner(MockRegistry::new())
            .compute(
                &request("3.0.2", VersioningMode::AlwaysIncrementPatch),
                &stage("ci", false),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.normalized(), "3.0.3-u20160108-173613-ci");
    }

    #[tokio::test]
    async fn automatic_latest_revision_bumps_published_revision() {
        let version = versioner(published(&["3.0.0.4", "3.0.1.10", "3.0.2"]))
            .compute(
                &request("3.0.1", VersioningMode::AutomaticLatestRevision),
                &stage("ci", false),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.normalized(), "3.0.1.11-u20160108-173613-ci");
    }

    #[tokio::test]
    async fn automatic_latest_patch_bumps_published_patch() {
        let version = versioner(published(&["3.0.4", "3.0.6-ci", "3.1.0"]))
            .compute(
                &request("3.0.1", VersioningMode::AutomaticLatestPatch),
                &stage("ci", false),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.normalized(), "3.0.7-u20160108-173613-ci");
    }

    #[tokio::test]
    async fn automatic_latest_patch_ignores_prereleases_for_stable_stages() {
        let version = versioner(published(&["3.0.4", "3.0.6-ci"]))
            .compute(
                &request("3.0.1", VersioningMode::AutomaticLatestPatch),
                &stage("prod", true),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.to_string(), "3.0.5");
    }

    #[tokio::test]
    async fn automatic_modes_keep_base_when_nothing_is_published() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_all_versions()
            .returning(|_, _| Err(RegistryError::InvalidResponse("down".to_string())));

        let version = versioner(registry)
            .compute(
                &request("3.0.1", VersioningMode::AutomaticLatestRevision),
                &stage("ci", false),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.normalized(), "3.0.1-u20160108-173613-ci");
    }

    #[tokio::test]
    async fn increment_if_stable_exists_bumps_when_base_is_published() {
        let mut registry = MockRegistry::new();
        registry
            .expect_version_exists()
            .withf(|source, _, version| source == FEED && *version == SemanticVersion::new(1, 0, 1))
            .times(1)
            .returning(|_, _, _| Ok(true));

        let version = versioner(registry)
            .compute(
                &request("1.0.1", VersioningMode::IncrementPatchIfStableExistForPrerelease),
                &stage("ci", false),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.normalized(), "1.0.2-u20160108-173613-ci");
    }

    #[tokio::test]
    async fn increment_if_stable_exists_keeps_unpublished_base() {
        let mut registry = MockRegistry::new();
        registry
            .expect_version_exists()
            .withf(|source, _, version| source == FEED && *version == SemanticVersion::new(1, 0, 1))
            .times(1)
            .returning(|_, _, _| Ok(false));

        let version = versioner(registry)
            .compute(
                &request("1.0.1", VersioningMode::IncrementPatchIfStableExistForPrerelease),
                &stage("ci", false),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.normalized(), "1.0.1-u20160108-173613-ci");
    }

    #[tokio::test]
    async fn increment_if_stable_exists_keeps_stable_stages_unchanged() {
        let version = versioner(MockRegistry::new())
            .compute(
                &request("1.0.1", VersioningMode::IncrementPatchIfStableExistForPrerelease),
                &stage("prod", true),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.to_string(), "1.0.1");
    }

    #[tokio::test]
    async fn force_version_wins_over_mode() {
        let version = versioner(MockRegistry::new())
            .compute(
                &VersionRequest {
                    force_version: Some("{Major}.{Minor}.99".to_string()),
                    ..request("2.1.3", VersioningMode::AlwaysIncrementPatch)
                },
                &stage("ci", false),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.to_string(), "2.1.99");
    }

    #[tokio::test]
    async fn unparsable_force_version_falls_through() {
        let version = versioner(MockRegistry::new())
            .compute(
                &VersionRequest {
                    force_version: Some("none".to_string()),
                    ..request("2.1.3", VersioningMode::AlwaysIncrementPatch)
                },
                &stage("prod", true),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.to_string(), "2.1.4");
    }

    #[tokio::test]
    async fn version_format_replaces_base_and_disables_mode() {
        let version = versioner(MockRegistry::new())
            .compute(
                &VersionRequest {
                    version_format: Some("{Major}.{Minor}.{Patch}.7".to_string()),
                    ..request("1.0.1", VersioningMode::AlwaysIncrementPatch)
                },
                &stage("dev", false),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.normalized(), "1.0.1.7-u20160108-173613-dev");
    }

    #[tokio::test]
    async fn metadata_prefers_base_version_metadata() {
        let version = versioner(MockRegistry::new())
            .compute(
                &VersionRequest {
                    metadata: Some("ignored".to_string()),
                    metadata_format: Some("{Metadata}.{DateTimeValue:yyyyMMdd}".to_string()),
                    ..request("1.0.1+sha.abc", VersioningMode::NoChange)
                },
                &stage("prod", true),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.to_string(), "1.0.1+sha.abc.20160108");
    }

    #[tokio::test]
    async fn metadata_falls_back_to_request_metadata() {
        let version = versioner(MockRegistry::new())
            .compute(
                &VersionRequest {
                    metadata: Some("build 42".to_string()),
                    ..request("1.0.1", VersioningMode::NoChange)
                },
                &stage("prod", true),
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.to_string(), "1.0.1+build-42");
    }

    #[tokio::test]
    async fn stage_prerelease_format_is_used() {
        let mut selected = stage("ci", false);
        selected.stage.prerelease_format = Some("{Stage}.{Parameter}".to_string());

        let version = versioner(MockRegistry::new())
            .compute(
                &VersionRequest {
                    parameter: Some("build-7".to_string()),
                    ..request("1.0.1", VersioningMode::NoChange)
                },
                &selected,
                &sources(),
            )
            .await
            .unwrap();

        assert_eq!(version.normalized(), "1.0.1-ci.build-7");
    }

    #[tokio::test]
    async fn empty_prerelease_format_falls_back_to_default() {
        let mut selected = stage("ci", false);
        selected.stage.prerelease_format = Some("{Parameter}".to_string());

        let version = versioner(MockRegistry::new())
            .compute(&request("1.0.1", VersioningMode::NoChange), &selected, &sources())
            .await
            .unwrap();

        assert_eq!(version.normalized(), "1.0.1-u20160108-173613-ci");
    }

    #[tokio::test]
    async fn exhausted_published_patch_is_reported() {
        let result = versioner(published(&["1.0.18446744073709551615"]))
            .compute(
                &request("1.0.0", VersioningMode::AutomaticLatestPatch),
                &stage("ci", false),
                &sources(),
            )
            .await;

        assert!(matches!(result, Err(VersionError::InvalidVersion(_))));
    }

    #[tokio::test]
    async fn exhausted_published_revision_is_reported() {
        let result = versioner(published(&["1.0.0.18446744073709551615"]))
            .compute(
                &request("1.0.0", VersioningMode::AutomaticLatestRevision),
                &stage("prod", true),
                &sources(),
            )
            .await;

        assert!(matches!(result, Err(VersionError::InvalidVersion(_))));
    }

    #[tokio::test]
    async fn exhausted_base_patch_is_reported() {
        let result = versioner(MockRegistry::new())
            .compute(
                &request("1.0.18446744073709551615", VersioningMode::AlwaysIncrementPatch),
                &stage("ci", false),
                &sources(),
            )
            .await;

        assert!(matches!(result, Err(VersionError::InvalidVersion(_))));
    }

    #[tokio::test]
    async fn postfix_with_leading_zero_still_gets_a_label() {
        let selected = SelectedStage::new(
            Stage::new("integration", "ci", false, Regex::new(".+").unwrap(), FEED),
            None,
            Some("hotfix/2.05"),
        );

        let version = versioner(MockRegistry::new())
            .compute(&request("1.0.1", VersioningMode::NoChange), &selected, &sources())
            .await
            .unwrap();

        assert_eq!(version.normalized(), "1.0.1-u20160108-173613-ci-hotfix-2.5");
    }

    #[tokio::test]
    async fn invalid_base_version_is_reported() {
        let result = versioner(MockRegistry::new())
            .compute(&request("one.two", VersioningMode::NoChange), &stage("ci", false), &sources())
            .await;

        assert!(matches!(result, Err(VersionError::InvalidVersion(_))));
    }
}
