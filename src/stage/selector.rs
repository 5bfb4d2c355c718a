//! Stage selection
//!
//! Candidates are evaluated in priority order: promoted production, production,
//! integration, development. The first candidate whose trigger pattern matches
//! its input wins. When nothing matches, a local fallback stage is produced, so
//! every selection yields exactly one stage.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::stage::error::StageError;
use crate::stage::properties::parse_fallback;
use crate::stage::spec::{StageDefaults, StageSpecParser};
use crate::stage::types::{
    DEVELOPMENT, INTEGRATION, LOCAL, PRODUCTION, SelectedStage, Stage,
};

/// Default version-stage names used in prerelease labels
pub const PRODUCTION_VERSION_STAGE: &str = "prod";
pub const INTEGRATION_VERSION_STAGE: &str = "ci";
pub const DEVELOPMENT_VERSION_STAGE: &str = "dev";

/// Trigger prefix that publishes to the configured default push source
const DEFAULT_TRIGGER_PREFIX: &str = "default";
const DEFAULT_STABLE_TRIGGER: &str = "default-stable";
const LOCAL_STABLE_TRIGGER: &str = "local-stable";

static MATCH_ALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(".*").expect("match-all pattern is valid"));

/// Everything needed to select a stage for one build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRequest {
    /// Runtime value matched against stage patterns (e.g. a branch ref)
    pub trigger: String,
    pub production: Option<String>,
    pub integration: Option<String>,
    pub development: Option<String>,
    /// `[#name|]key=value|...` for the local fallback stage
    pub fallback: Option<String>,
    pub promotion_input: Option<String>,
    pub promotion_pattern: Option<String>,
    /// Location local and fallback stages publish to
    pub local_source: String,
    pub allow_local_publish: bool,
    pub prefix: Option<String>,
    pub postfix: Option<String>,
    pub api_key: Option<String>,
    pub symbols_api_key: Option<String>,
    pub prerelease_format: Option<String>,
}

/// Selects the stage a build publishes to
pub struct StageSelector {
    parser: StageSpecParser,
    default_push_source: Option<String>,
    local_stage_name: String,
}

impl StageSelector {
    pub fn new(settings: &Settings) -> Self {
        Self {
            parser: StageSpecParser::new(),
            default_push_source: settings.default_push_source.clone(),
            local_stage_name: settings.local_stage_name.clone(),
        }
    }

    pub fn select(&self, request: &SelectionRequest) -> Result<SelectedStage, StageError> {
        if let Some(stage) = self.reserved_stage(request)? {
            info!(
                "Trigger '{}' selects reserved stage {} ({})",
                request.trigger, stage.name, stage.version_stage
            );
            return Ok(self.with_defaults(stage, request));
        }

        for (stage, input) in self.candidates(request) {
            let Some(caps) = stage.trigger.captures(input) else {
                debug!(
                    "Stage {} pattern '{}' does not match '{}'",
                    stage.name,
                    stage.trigger.as_str(),
                    input
                );
                continue;
            };

            let prefix = caps
                .name("Prefix")
                .map(|m| m.as_str())
                .filter(|captured| !captured.is_empty())
                .or(request.prefix.as_deref());
            let postfix = caps
                .name("Postfix")
                .map(|m| m.as_str())
                .filter(|captured| !captured.is_empty())
                .or(request.postfix.as_deref());

            info!(
                "Selected stage {} ({}){} for '{}'",
                stage.name,
                stage.version_stage,
                if stage.is_promotion { " by promotion" } else { "" },
                input
            );
            return Ok(SelectedStage::new(stage.clone(), prefix, postfix));
        }

        let stage = self.fallback_stage(request);
        info!(
            "No stage matched '{}', falling back to {} ({}), enabled: {}",
            request.trigger, stage.name, stage.version_stage, stage.is_enabled
        );
        Ok(self.with_defaults(stage, request))
    }

    /// Stages synthesized for the `default*` and `local-stable` triggers
    fn reserved_stage(&self, request: &SelectionRequest) -> Result<Option<Stage>, StageError> {
        let trigger = request.trigger.trim();
        let lowered = trigger.to_ascii_lowercase();

        let stage = if lowered.starts_with(DEFAULT_TRIGGER_PREFIX) {
            let push_source = self
                .default_push_source
                .as_deref()
                .ok_or_else(|| StageError::MissingDefaultSource(trigger.to_string()))?;
            if lowered == DEFAULT_STABLE_TRIGGER {
                Stage::new(
                    PRODUCTION,
                    PRODUCTION_VERSION_STAGE,
                    true,
                    MATCH_ALL.clone(),
                    push_source,
                )
            } else {
                Stage::new(
                    LOCAL,
                    &self.local_stage_name,
                    false,
                    MATCH_ALL.clone(),
                    push_source,
                )
            }
        } else if trigger == LOCAL_STABLE_TRIGGER {
            Stage::new(
                LOCAL,
                &self.local_stage_name,
                true,
                MATCH_ALL.clone(),
                &request.local_source,
            )
        } else {
            return Ok(None);
        };

        Ok(Some(Stage {
            api_key: request.api_key.clone(),
            prerelease_format: request.prerelease_format.clone(),
            ..stage
        }))
    }

    /// Parsed candidates paired with the input each is matched against
    fn candidates<'a>(&self, request: &'a SelectionRequest) -> Vec<(Stage, &'a str)> {
        let defaults = |name: &'static str, version_stage: &'static str, is_stable: bool| {
            StageDefaults {
                name,
                version_stage,
                is_stable,
                api_key: request.api_key.as_deref(),
                symbols_api_key: request.symbols_api_key.as_deref(),
                prerelease_format: request.prerelease_format.as_deref(),
                additional_feed_sources: Vec::new(),
            }
        };

        let production = self.parser.parse(
            request.production.as_deref(),
            &defaults(PRODUCTION, PRODUCTION_VERSION_STAGE, true),
        );
        let integration = self.parser.parse(
            request.integration.as_deref(),
            &StageDefaults {
                additional_feed_sources: production
                    .as_ref()
                    .map(Stage::feed_chain)
                    .unwrap_or_default(),
                ..defaults(INTEGRATION, INTEGRATION_VERSION_STAGE, false)
            },
        );
        let development = self.parser.parse(
            request.development.as_deref(),
            &StageDefaults {
                additional_feed_sources: integration
                    .as_ref()
                    .or(production.as_ref())
                    .map(Stage::feed_chain)
                    .unwrap_or_default(),
                ..defaults(DEVELOPMENT, DEVELOPMENT_VERSION_STAGE, false)
            },
        );

        let mut candidates = Vec::with_capacity(4);
        if let (Some(input), Some(pattern), Some(production)) = (
            request.promotion_input.as_deref(),
            request.promotion_pattern.as_deref(),
            production.as_ref(),
        ) {
            match Regex::new(pattern) {
                Ok(trigger) => candidates.push((production.promoted(trigger), input)),
                Err(e) => warn!("Ignoring invalid promotion pattern '{}': {}", pattern, e),
            }
        }

        let trigger = request.trigger.as_str();
        candidates.extend(
            [production, integration, development]
                .into_iter()
                .flatten()
                .map(|stage| (stage, trigger)),
        );
        candidates
    }

    fn fallback_stage(&self, request: &SelectionRequest) -> Stage {
        let fallback = parse_fallback(request.fallback.as_deref());
        let version_stage = fallback.name.as_deref().unwrap_or(&self.local_stage_name);

        Stage {
            prerelease_format: request.prerelease_format.clone(),
            properties: fallback.properties,
            is_enabled: request.allow_local_publish,
            is_fallback: true,
            ..Stage::new(
                LOCAL,
                version_stage,
                false,
                MATCH_ALL.clone(),
                &request.local_source,
            )
        }
    }

    fn with_defaults(&self, stage: Stage, request: &SelectionRequest) -> SelectedStage {
        SelectedStage::new(stage, request.prefix.as_deref(), request.postfix.as_deref())
    }
}
