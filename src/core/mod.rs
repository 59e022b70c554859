//! Core types shared by every pipeline stage.
//!
//! # Modules
//!
//! ## `error` - Error taxonomy
//!
//! - [`IngestError`] - per-stage failures, cloneable, classified by [`ErrorKind`]
//! - [`HelmvalsError`] - top-level error for configuration and CLI failures
//! - [`ErrorContext`] / [`user_friendly_error`] - user-facing rendering with suggestions
//!
//! ## `chart` - Chart identity
//!
//! - [`ChartSpec`] - one entry of the work list, a chart name paired with a repository name
//!
//! # Error Handling Pattern
//!
//! Stages return `Result<T, IngestError>`; the orchestrator converts each failure
//! into a dropped chart. Configuration and CLI code uses `anyhow::Result` and
//! converts at the very end with [`user_friendly_error`].
//!
//! ```rust,no_run
//! use helmvals::core::{ChartSpec, IngestError};
//!
//! fn lookup(spec: &ChartSpec) -> Result<(), IngestError> {
//!     Err(IngestError::ChartNotFound {
//!         chart: spec.chart_name.clone(),
//!         repository: spec.repository_name.clone(),
//!     })
//! }
//! ```

pub mod chart;
pub mod error;

pub use chart::ChartSpec;
pub use error::{
    ErrorContext, ErrorKind, HelmvalsError, IngestError, is_transient_status, user_friendly_error,
};
