//! Snapshot of a resolution handed to publish steps

use serde::Serialize;

use crate::stage::SelectedStage;
use crate::version::SemanticVersion;

/// Where and under which version a package is published
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishInfo {
    pub package_id: String,
    pub stage: String,
    pub version_stage: String,
    pub is_promotion: bool,
    pub is_enabled: bool,
    pub is_fallback: bool,
    pub push_source: String,
    pub api_key: Option<String>,
    pub feed_source: String,
    pub symbols_source: Option<String>,
    pub symbols_api_key: Option<String>,
    /// Version without metadata
    pub version: String,
    /// Version including metadata
    pub full_version: String,
    pub metadata: Option<String>,
}

impl PublishInfo {
    pub fn new(package_id: &str, selected: &SelectedStage, version: &SemanticVersion) -> Self {
        let stage = &selected.stage;
        Self {
            package_id: package_id.to_string(),
            stage: stage.name.clone(),
            version_stage: stage.version_stage.clone(),
            is_promotion: stage.is_promotion,
            is_enabled: stage.is_enabled,
            is_fallback: stage.is_fallback,
            push_source: stage.push_source.clone(),
            api_key: stage.api_key.clone(),
            feed_source: stage.feed_source.clone(),
            symbols_source: stage.symbols_source.clone(),
            symbols_api_key: stage.symbols_api_key.clone(),
            version: version.normalized(),
            full_version: version.to_string(),
            metadata: (!version.metadata.is_empty()).then(|| version.metadata.to_string()),
        }
    }
}
