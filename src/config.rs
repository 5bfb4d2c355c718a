use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// =============================================================================
// Time-related constants
// =============================================================================

/// Timeout for a single registry fetch in milliseconds (30 seconds)
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

// =============================================================================
// Defaults
// =============================================================================

/// Version-stage name of local and fallback stages
pub const DEFAULT_LOCAL_STAGE_NAME: &str = "local";

pub const PUBLIC_REGISTRY_NAME: &str = "nuget.org";
pub const PUBLIC_REGISTRY_URI: &str = "https://api.nuget.org/v3-flatcontainer";

/// Environment variable overriding `defaultPushSource`
pub const DEFAULT_SOURCE_ENV: &str = "STAGEVER_DEFAULT_SOURCE";

/// Settings shared by every resolution
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Push source used by the reserved `default*` triggers
    pub default_push_source: Option<String>,
    /// Version-stage name for local and fallback stages
    pub local_stage_name: String,
    /// Well-known public registry, queried on request
    pub public_registry: RegistrySource,
    /// Every other configured registry
    pub registries: Vec<RegistrySource>,
    /// Per-source timeout for version lookups in milliseconds
    pub fetch_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_push_source: None,
            local_stage_name: DEFAULT_LOCAL_STAGE_NAME.to_string(),
            public_registry: RegistrySource::new(PUBLIC_REGISTRY_NAME, PUBLIC_REGISTRY_URI),
            registries: Vec::new(),
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

/// A named package registry location
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistrySource {
    pub name: String,
    pub uri: String,
    pub enabled: bool,
}

impl RegistrySource {
    pub fn new(name: &str, uri: &str) -> Self {
        Self {
            name: name.to_string(),
            uri: uri.to_string(),
            enabled: true,
        }
    }
}

impl Default for RegistrySource {
    fn default() -> Self {
        Self {
            name: String::new(),
            uri: String::new(),
            enabled: true,
        }
    }
}

/// Error type for loading settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Settings {
    /// Loads settings from the given file, or from the data directory when no
    /// path is given, falling back to defaults if that file does not exist.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = settings_path();
        let path = match path {
            Some(path) => Some(path),
            None if default_path.exists() => Some(default_path.as_path()),
            None => None,
        };

        let settings = match path {
            Some(path) => {
                info!("Loading settings from {:?}", path);
                Self::from_file(path)?
            }
            None => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        };

        Ok(settings.with_env_overrides(std::env::var(DEFAULT_SOURCE_ENV).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn with_env_overrides(mut self, default_source: Option<String>) -> Self {
        if let Some(source) = default_source.filter(|s| !s.trim().is_empty()) {
            debug!("Default push source overridden by {}", DEFAULT_SOURCE_ENV);
            self.default_push_source = Some(source);
        }
        self
    }
}

/// Returns the path to the data directory for stagever.
/// Uses $XDG_DATA_HOME/stagever if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/stagever,
/// or ./stagever if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the default settings file.
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("stagever.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("stagever")
}
