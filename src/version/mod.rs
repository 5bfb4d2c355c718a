//! Version computation layer
//!
//! Turns a base version and a selected stage into the version a package is
//! published under, consulting package registries when the versioning mode
//! depends on what is already published.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Sources   │────▶│  Versioner  │◀────│    Label    │
//! │ (aggregate) │     │  (compute)  │     │ (template)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │   Lookup    │────▶│  Registries │
//!                     │  (fan-out)  │     │(http, local)│
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`sources`]: Ordered, duplicate-free source list for a stage
//! - [`versioner`]: Force, reformat, mode dispatch and labelling
//! - [`lookup`]: Concurrent latest-version queries across sources
//! - [`label`]: Prerelease label and metadata templating
//! - [`registry`]: Registry trait for listing published versions
//! - [`registries`]: HTTP, local directory and routing implementations
//! - [`mode`]: Versioning policies
//! - [`semver`]: Four-part semantic versions
//! - [`error`]: Error types for registry and version operations
//! - [`types`]: Common types like `PackageVersions`

pub mod error;
pub mod label;
pub mod lookup;
pub mod mode;
pub mod registries;
pub mod registry;
pub mod semver;
pub mod sources;
pub mod types;
pub mod versioner;

pub use error::{RegistryError, VersionError};
pub use mode::VersioningMode;
pub use registry::Registry;
pub use semver::SemanticVersion;
pub use sources::{SourceOptions, aggregate_sources};
pub use versioner::{PackageVersioner, VersionRequest};
