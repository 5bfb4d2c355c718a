//! Stage domain types

use indexmap::IndexMap;
use regex::Regex;

/// Human stage names
pub const PRODUCTION: &str = "production";
pub const INTEGRATION: &str = "integration";
pub const DEVELOPMENT: &str = "development";
pub const LOCAL: &str = "local";

/// A named publish target with its own trigger rule and destination
#[derive(Debug, Clone)]
pub struct Stage {
    /// Pattern the trigger string must match
    pub trigger: Regex,
    /// Registry the package is pushed to
    pub push_source: String,
    pub api_key: Option<String>,
    pub symbols_source: Option<String>,
    pub symbols_api_key: Option<String>,
    /// Human stage name (production, integration, ...)
    pub name: String,
    /// Short name used inside generated prerelease labels (prod, ci, dev, ...)
    pub version_stage: String,
    pub is_stable: bool,
    /// Registry queried for already published versions
    pub feed_source: String,
    pub prerelease_format: Option<String>,
    /// Feed sources inherited from less specific stages, closest first
    pub additional_feed_sources: Vec<String>,
    pub properties: IndexMap<String, String>,
    pub is_enabled: bool,
    pub is_fallback: bool,
    pub is_promotion: bool,
}

impl Stage {
    /// Creates an enabled, non-fallback stage whose feed is its push source
    pub fn new(
        name: &str,
        version_stage: &str,
        is_stable: bool,
        trigger: Regex,
        push_source: &str,
    ) -> Self {
        Self {
            trigger,
            push_source: push_source.to_string(),
            api_key: None,
            symbols_source: None,
            symbols_api_key: None,
            name: name.to_string(),
            version_stage: version_stage.to_string(),
            is_stable,
            feed_source: push_source.to_string(),
            prerelease_format: None,
            additional_feed_sources: Vec::new(),
            properties: IndexMap::new(),
            is_enabled: true,
            is_fallback: false,
            is_promotion: false,
        }
    }

    /// Copy of this stage with extra inherited feed sources appended
    pub fn with_additional_feed_sources(mut self, sources: Vec<String>) -> Self {
        self.additional_feed_sources.extend(sources);
        self
    }

    /// This stage's feed followed by everything it inherits, closest first
    pub fn feed_chain(&self) -> Vec<String> {
        std::iter::once(self.feed_source.clone())
            .chain(self.additional_feed_sources.iter().cloned())
            .collect()
    }

    /// Copy of this stage triggered by a different pattern, tagged as a promotion
    pub fn promoted(&self, trigger: Regex) -> Self {
        Self {
            trigger,
            is_promotion: true,
            ..self.clone()
        }
    }
}

impl PartialEq for Stage {
    fn eq(&self, other: &Self) -> bool {
        self.trigger.as_str() == other.trigger.as_str()
            && self.push_source == other.push_source
            && self.api_key == other.api_key
            && self.symbols_source == other.symbols_source
            && self.symbols_api_key == other.symbols_api_key
            && self.name == other.name
            && self.version_stage == other.version_stage
            && self.is_stable == other.is_stable
            && self.feed_source == other.feed_source
            && self.prerelease_format == other.prerelease_format
            && self.additional_feed_sources == other.additional_feed_sources
            && self.properties == other.properties
            && self.is_enabled == other.is_enabled
            && self.is_fallback == other.is_fallback
            && self.is_promotion == other.is_promotion
    }
}

impl Eq for Stage {}

/// The stage chosen for one resolution together with its resolved label parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedStage {
    pub stage: Stage,
    /// Prerelease prefix; empty when neither matched nor defaulted
    pub prefix: String,
    /// Prerelease postfix; empty when neither matched nor defaulted
    pub postfix: String,
}

impl SelectedStage {
    pub fn new(stage: Stage, prefix: Option<&str>, postfix: Option<&str>) -> Self {
        Self {
            stage,
            prefix: prefix.unwrap_or_default().to_string(),
            postfix: postfix.unwrap_or_default().to_string(),
        }
    }
}
