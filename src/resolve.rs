//! Resolution facade
//!
//! One resolution selects a stage, aggregates the sources to query, computes
//! the version and renders the output templates. Failures are scoped to the
//! single resolution; batches always yield one result per request.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info};

use crate::config::Settings;
use crate::output::{OutputLine, output_facts, render_outputs};
use crate::publish::PublishInfo;
use crate::stage::{SelectedStage, SelectionRequest, StageError, StageSelector};
use crate::version::registries::SourceRegistry;
use crate::version::{
    PackageVersioner, Registry, RegistryError, SemanticVersion, SourceOptions, VersionError,
    VersionRequest, aggregate_sources,
};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Stage selection failed: {0}")]
    Stage(#[from] StageError),

    #[error("Versioning failed: {0}")]
    Version(#[from] VersionError),
}

/// Everything needed to resolve one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub selection: SelectionRequest,
    pub version: VersionRequest,
    pub sources: SourceOptions,
    /// Output template strings, each possibly holding several templates
    pub outputs: Vec<String>,
}

/// Outcome of a successful resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub selected: SelectedStage,
    pub sources: Vec<String>,
    pub version: SemanticVersion,
    pub info: PublishInfo,
    pub outputs: Vec<OutputLine>,
}

pub struct Resolver {
    settings: Settings,
    selector: StageSelector,
    versioner: PackageVersioner,
}

impl Resolver {
    pub fn new(settings: Settings, registry: Arc<dyn Registry>) -> Self {
        Self {
            selector: StageSelector::new(&settings),
            versioner: PackageVersioner::new(registry, settings.fetch_timeout_ms),
            settings,
        }
    }

    /// Creates a Resolver querying HTTP feeds and local directories
    pub fn with_default_registry(settings: Settings) -> Result<Self, RegistryError> {
        let registry = SourceRegistry::with_defaults()?;
        Ok(Self::new(settings, Arc::new(registry)))
    }

    pub async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError> {
        let selected = self.selector.select(&request.selection)?;
        let sources = aggregate_sources(&selected, &request.sources, &self.settings);
        let version = self
            .versioner
            .compute(&request.version, &selected, &sources)
            .await?;

        let info = PublishInfo::new(&request.version.package_id, &selected, &version);
        let facts = output_facts(
            &info,
            &version,
            request.version.parameter.as_deref(),
            &selected.stage.properties,
        );
        let outputs = render_outputs(&request.outputs, &facts);

        info!(
            "Resolved {} {} for stage {}{}",
            info.package_id,
            info.full_version,
            info.stage,
            if info.is_enabled { "" } else { " (publishing disabled)" }
        );

        Ok(Resolution {
            selected,
            sources,
            version,
            info,
            outputs,
        })
    }

    /// Resolve several packages, one result per request in request order
    pub async fn resolve_all(
        &self,
        requests: &[ResolveRequest],
    ) -> Vec<Result<Resolution, ResolveError>> {
        let results = join_all(requests.iter().map(|request| self.resolve(request))).await;

        for (request, result) in requests.iter().zip(&results) {
            if let Err(e) = result {
                error!("Failed to resolve {}: {}", request.version.package_id, e);
            }
        }
        results
    }
}
