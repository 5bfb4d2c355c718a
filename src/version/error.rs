use thiserror::Error;

use crate::template::TemplateError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported resource: {0}")]
    UnsupportedResource(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Invalid version: '{0}'")]
    InvalidVersion(String),

    #[error("Invalid version label {0}")]
    InvalidLabel(String),

    #[error("Unknown versioning mode: '{0}'")]
    UnknownMode(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}
