use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("Trigger '{0}' requires a default push source, but none is configured")]
    MissingDefaultSource(String),
}
