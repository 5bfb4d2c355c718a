//! Latest published version lookup across several sources
//!
//! Sources are queried in parallel with staggered start times. Every source
//! is bounded by a timeout; failing, timed-out and empty sources are logged
//! and excluded from the merge rather than failing the lookup.

use std::time::Duration;

use futures::future::join_all;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::config::FETCH_STAGGER_DELAY_MS;
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::semver::SemanticVersion;

/// Which published versions count as candidates for "latest"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestVersionQuery<'a> {
    pub package_id: &'a str,
    pub major: u64,
    pub minor: u64,
    /// When set, only versions with this patch are considered
    pub patch: Option<u64>,
    pub include_prerelease: bool,
}

impl LatestVersionQuery<'_> {
    fn accepts(&self, version: &SemanticVersion) -> bool {
        version.major == self.major
            && version.minor == self.minor
            && self.patch.is_none_or(|patch| version.patch == patch)
            && (self.include_prerelease || !version.is_prerelease())
    }
}

/// Outcome of querying one source
enum SourceOutcome {
    Found(SemanticVersion),
    Empty,
    Failed,
}

async fn query_source(
    registry: &dyn Registry,
    source: &str,
    query: &LatestVersionQuery<'_>,
    timeout_ms: u64,
) -> SourceOutcome {
    let result = timeout(
        Duration::from_millis(timeout_ms),
        registry.fetch_all_versions(source, query.package_id),
    )
    .await
    .unwrap_or_else(|_| Err(RegistryError::Timeout(timeout_ms)));

    match result {
        Ok(versions) => match versions.parsed().filter(|v| query.accepts(v)).max() {
            Some(latest) => {
                debug!(
                    "Latest {} matching {}.{} in {}: {}",
                    query.package_id, query.major, query.minor, source, latest
                );
                SourceOutcome::Found(latest)
            }
            None => {
                debug!(
                    "No version of {} matching {}.{} in {}",
                    query.package_id, query.major, query.minor, source
                );
                SourceOutcome::Empty
            }
        },
        Err(RegistryError::UnsupportedResource(resource)) => {
            error!(
                "Source {} does not support version lookup for {}: {}",
                source, query.package_id, resource
            );
            SourceOutcome::Failed
        }
        Err(e) => {
            warn!(
                "Failed to fetch versions of {} from {}: {}",
                query.package_id, source, e
            );
            SourceOutcome::Failed
        }
    }
}

/// Find the highest published version matching the query across all sources
///
/// Returns `None` when no source yields a matching version, including when
/// every source failed.
pub async fn find_latest_version(
    registry: &dyn Registry,
    sources: &[String],
    query: &LatestVersionQuery<'_>,
    timeout_ms: u64,
) -> Option<SemanticVersion> {
    if sources.is_empty() {
        debug!("No sources to query for {}", query.package_id);
        return None;
    }

    let futures = sources.iter().enumerate().map(|(i, source)| {
        let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * i as u64);
        async move {
            sleep(delay).await;
            query_source(registry, source, query, timeout_ms).await
        }
    });

    let outcomes = join_all(futures).await;

    let failures = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, SourceOutcome::Failed))
        .count();
    if failures == sources.len() {
        warn!(
            "Every source failed while looking up {}; treating as unpublished",
            query.package_id
        );
    }

    let latest = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            SourceOutcome::Found(version) => Some(version),
            SourceOutcome::Empty | SourceOutcome::Failed => None,
        })
        .max();

    if let Some(latest) = &latest {
        info!(
            "Latest published {} across {} sources: {}",
            query.package_id,
            sources.len(),
            latest
        );
    }
    latest
}

/// Check whether an exact version is published at one source
///
/// Failures are logged and reported as "not published".
pub async fn version_exists_at(
    registry: &dyn Registry,
    source: &str,
    package_id: &str,
    version: &SemanticVersion,
    timeout_ms: u64,
) -> bool {
    let result = timeout(
        Duration::from_millis(timeout_ms),
        registry.version_exists(source, package_id, version),
    )
    .await
    .unwrap_or_else(|_| Err(RegistryError::Timeout(timeout_ms)));

    result
        .inspect_err(|e| {
            warn!(
                "Failed to check {} {} at {}: {}",
                package_id, version, source, e
            )
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::registry::MockRegistry;
    use crate::version::types::PackageVersions;
    use mockall::predicate::eq;

    fn versions(list: &[&str]) -> PackageVersions {
        PackageVersions::new(list.iter().map(|v| v.to_string()).collect())
    }

    fn query(patch: Option<u64>, include_prerelease: bool) -> LatestVersionQuery<'static> {
        LatestVersionQuery {
            package_id: "pkg",
            major: 3,
            minor: 0,
            patch,
            include_prerelease,
        }
    }

    fn sources(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn find_latest_version_merges_maximum_across_sources() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_all_versions()
            .with(eq("https://a"), eq("pkg"))
            .times(1)
            .returning(|_, _| Ok(versions(&["3.0.1", "3.0.4", "3.1.0"])));
        registry
            .expect_fetch_all_versions()
            .with(eq("https://b"), eq("pkg"))
            .times(1)
            .returning(|_, _| Ok(versions(&["3.0.7", "4.0.0"])));

        let latest = find_latest_version(
            &registry,
            &sources(&["https://a", "https://b"]),
            &query(None, false),
            1_000,
        )
        .await;

        assert_eq!(latest, Some(SemanticVersion::new(3, 0, 7)));
    }

    #[tokio::test]
    async fn find_latest_version_excludes_failing_sources() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_all_versions()
            .with(eq("https://down"), eq("pkg"))
            .returning(|_, _| Err(RegistryError::InvalidResponse("503".to_string())));
        registry
            .expect_fetch_all_versions()
            .with(eq("ftp://odd"), eq("pkg"))
            .returning(|_, _| Err(RegistryError::UnsupportedResource("ftp://odd".to_string())));
        registry
            .expect_fetch_all_versions()
            .with(eq("https://up"), eq("pkg"))
            .returning(|_, _| Ok(versions(&["3.0.2"])));

        let latest = find_latest_version(
            &registry,
            &sources(&["https://down", "ftp://odd", "https://up"]),
            &query(None, false),
            1_000,
        )
        .await;

        assert_eq!(latest, Some(SemanticVersion::new(3, 0, 2)));
    }

    #[tokio::test]
    async fn find_latest_version_returns_none_when_every_source_fails() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_all_versions()
            .returning(|_, _| Err(RegistryError::InvalidResponse("down".to_string())));

        let latest = find_latest_version(
            &registry,
            &sources(&["https://a", "https://b"]),
            &query(None, false),
            1_000,
        )
        .await;

        assert_eq!(latest, None);
    }

    #[tokio::test]
    async fn find_latest_version_skips_registry_without_sources() {
        let mut registry = MockRegistry::new();
        registry.expect_fetch_all_versions().times(0);

        let latest = find_latest_version(&registry, &[], &query(None, false), 1_000).await;

        assert_eq!(latest, None);
    }

    #[tokio::test]
    async fn find_latest_version_filters_by_patch_and_prerelease() {
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_all_versions()
            .returning(|_, _| Ok(versions(&["3.0.1.10", "3.0.1.11-ci", "3.0.2.1", "3.0.1"])));

        let stable = find_latest_version(
            &registry,
            &sources(&["https://a"]),
            &query(Some(1), false),
            1_000,
        )
        .await;
        let with_prerelease = find_latest_version(
            &registry,
            &sources(&["https://a"]),
            &query(Some(1), true),
            1_000,
        )
        .await;

        assert_eq!(stable, Some("3.0.1.10".parse().unwrap()));
        assert_eq!(with_prerelease, Some("3.0.1.11-ci".parse().unwrap()));
    }

    /// Answers every source except `https://stalled`, which never responds
    struct StalledRegistry;

    #[async_trait::async_trait]
    impl Registry for StalledRegistry {
        async fn fetch_all_versions(
            &self,
            source: &str,
            _package_id: &str,
        ) -> Result<PackageVersions, RegistryError> {
            if source == "https://stalled" {
                std::future::pending::<()>().await;
            }
            Ok(versions(&["3.0.5"]))
        }

        async fn version_exists(
            &self,
            _source: &str,
            _package_id: &str,
            _version: &SemanticVersion,
        ) -> Result<bool, RegistryError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn find_latest_version_drops_sources_that_time_out() {
        let latest = find_latest_version(
            &StalledRegistry,
            &sources(&["https://stalled", "https://up"]),
            &query(None, false),
            1_000,
        )
        .await;

        assert_eq!(latest, Some(SemanticVersion::new(3, 0, 5)));
    }

    #[tokio::test(start_paused = true)]
    async fn find_latest_version_returns_none_when_every_source_times_out() {
        let latest = find_latest_version(
            &StalledRegistry,
            &sources(&["https://stalled"]),
            &query(None, false),
            1_000,
        )
        .await;

        assert_eq!(latest, None);
    }

    #[tokio::test(start_paused = true)]
    async fn version_exists_at_treats_timeouts_as_missing() {
        let exists = version_exists_at(
            &StalledRegistry,
            "https://stalled",
            "pkg",
            &SemanticVersion::new(1, 0, 0),
            1_000,
        )
        .await;

        assert!(!exists);
    }

    #[tokio::test]
    async fn version_exists_at_treats_errors_as_missing() {
        let mut registry = MockRegistry::new();
        registry
            .expect_version_exists()
            .returning(|_, _, _| Err(RegistryError::InvalidResponse("down".to_string())));

        let exists = version_exists_at(
            &registry,
            "https://a",
            "pkg",
            &SemanticVersion::new(1, 0, 0),
            1_000,
        )
        .await;

        assert!(!exists);
    }

    #[tokio::test]
    async fn version_exists_at_reports_registry_answer() {
        let mut registry = MockRegistry::new();
        registry
            .expect_version_exists()
            .withf(|source, package, version| {
                source == "/feed" && package == "pkg" && *version == SemanticVersion::new(1, 0, 0)
            })
            .returning(|_, _, _| Ok(true));

        let exists = version_exists_at(
            &registry,
            "/feed",
            "pkg",
            &SemanticVersion::new(1, 0, 0),
            1_000,
        )
        .await;

        assert!(exists);
    }
}
