//! Builds the ordered list of sources queried for published versions

use indexmap::IndexSet;
use tracing::debug;

use crate::config::Settings;
use crate::stage::SelectedStage;
use crate::version::registries::SourceLocation;

/// Which sources beyond the stage's own feed chain to query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOptions {
    pub include_public_registry: bool,
    pub include_all_registries: bool,
    /// Pipe-delimited registry names or URIs
    pub overrides: Option<String>,
}

fn is_reachable(source: &str) -> bool {
    match SourceLocation::classify(source) {
        SourceLocation::Remote(_) => true,
        SourceLocation::Local(path) => path.exists(),
        SourceLocation::Unsupported(_) => false,
    }
}

fn resolve_override<'a>(entry: &'a str, settings: &'a Settings) -> &'a str {
    settings
        .registries
        .iter()
        .chain(std::iter::once(&settings.public_registry))
        .find(|registry| registry.name == entry || registry.uri == entry)
        .map(|registry| registry.uri.as_str())
        .unwrap_or(entry)
}

/// Aggregate the sources to query for the selected stage
///
/// The stage's own feed comes first, followed by inherited feeds closest
/// first. Feed chain entries are kept only when remote or an existing local
/// path. The result never contains duplicates.
pub fn aggregate_sources(
    selected: &SelectedStage,
    options: &SourceOptions,
    settings: &Settings,
) -> Vec<String> {
    let mut sources: IndexSet<String> = IndexSet::new();

    for feed in selected.stage.feed_chain() {
        if is_reachable(&feed) {
            sources.insert(feed);
        } else {
            debug!("Skipping unreachable feed {}", feed);
        }
    }

    if options.include_public_registry && !settings.public_registry.uri.is_empty() {
        sources.insert(settings.public_registry.uri.clone());
    }

    if options.include_all_registries {
        sources.extend(
            settings
                .registries
                .iter()
                .filter(|registry| registry.enabled && !registry.uri.is_empty())
                .map(|registry| registry.uri.clone()),
        );
    }

    if let Some(overrides) = &options.overrides {
        sources.extend(
            overrides
                .split('|')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| resolve_override(entry, settings).to_string()),
        );
    }

    debug!(
        "Aggregated {} sources for stage {}",
        sources.len(),
        selected.stage.name
    );
    sources.into_iter().collect()
}
