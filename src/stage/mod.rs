//! Stage layer
//! - types.rs: Stage and SelectedStage
//! - spec.rs: stage specification parser
//! - properties.rs: fallback stage mini-syntax and property lists
//! - selector.rs: trigger matching, promotion and local fallback
//! - error.rs: stage selection errors

pub mod error;
pub mod properties;
pub mod selector;
pub mod spec;
pub mod types;

pub use error::StageError;
pub use selector::{SelectionRequest, StageSelector};
pub use spec::{StageDefaults, StageSpecParser};
pub use types::{SelectedStage, Stage};
