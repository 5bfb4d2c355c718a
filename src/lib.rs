//! Stage selection and semantic version computation for package publishing
//!
//! A build names a trigger (usually a branch or tag). The [`stage`] layer
//! picks the publish stage that trigger belongs to, the [`version`] layer
//! computes the version to publish under, and [`output`] renders the result
//! for the surrounding build system. [`resolve::Resolver`] ties them together.

pub mod config;
pub mod logging;
pub mod output;
pub mod publish;
pub mod resolve;
pub mod stage;
pub mod template;
pub mod version;
