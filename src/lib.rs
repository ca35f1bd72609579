//! ObjectSet operator - remote phase reconciliation for package deployments
//!
//! An ObjectSet describes one revision of a deployment as an ordered list of
//! phases. Phases carrying a class are delegated to an external controller
//! through ObjectSetPhase objects; this crate creates, converges and tears
//! down those objects and folds their reported health back into the
//! ObjectSet's status.
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (ObjectSet, ObjectSetPhase and their cluster-scoped variants)
//! - [`controller`] - ObjectSet control loop and remote phase reconciliation
//! - [`package`] - Package content loading and validation
//! - [`backoff`] - Requeue backoff for failed passes
//! - [`config`] - Controller configuration
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod backoff;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod package;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager used for all writes to the API server
pub const FIELD_MANAGER: &str = "objectset-operator";
