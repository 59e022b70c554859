//! helmvals - Helm chart values ingestion
//!
//! Builds a static dataset of the default configuration (`values.yaml`) shipped
//! with a curated list of Helm charts. For each chart the pipeline resolves the
//! chart's repository, reads the repository index, picks a version, downloads
//! and unpacks the packaged chart, and turns its `values.yaml` into a JSON
//! record. The records are written to one or more output directories consumed
//! by a static catalogue site.
//!
//! # Architecture Overview
//!
//! ```text
//! ChartSpec ─► registry ─► index ─► version ─► fetch ─► extract ─► record
//!                                                                    │
//!                                             publish ◄── pipeline ◄─┘
//! ```
//!
//! A failing chart is dropped and reported; it never stops the run. The
//! dataset is published once, after every chart was attempted.
//!
//! # Core Modules
//!
//! - [`registry`] - Repository name to base URL, and the built-in work list
//! - [`index`] - Repository index parsing and the per-run index cache
//! - [`version`] - Version selection and download URL resolution
//! - [`fetch`] - Streaming artifact download
//! - [`extract`] - Archive extraction and `values.yaml` lookup
//! - [`record`] - The published chart record
//! - [`publish`] - Dataset files in every sink
//! - [`pipeline`] - Orchestration, failure isolation and run summaries
//!
//! ## Supporting Modules
//!
//! - [`cli`] - Command-line interface
//! - [`config`] - `helmvals.toml` configuration
//! - [`constants`] - File names, default paths and limits
//! - [`core`] - Error types and the chart spec
//! - [`utils`] - File system, platform, progress and retry helpers
//!
//! # Configuration (helmvals.toml)
//!
//! Every key is optional:
//!
//! ```toml
//! sinks = ["data", "public/data"]
//! layout = "both"              # consolidated | exploded | both
//! selection = "publisher-order" # or highest-semver
//! concurrency = 4
//!
//! [retry]
//! attempts = 3
//!
//! [repositories]
//! apache = "https://pinot.apache.org/charts"
//!
//! [[charts]]
//! name = "redis"
//! repo = "bitnami"
//! ```
//!
//! # Published Dataset
//!
//! ```text
//! {sink}/charts.json           [ChartRecord, ...]
//! {sink}/charts/{name}.json    ChartRecord
//! {sink}/charts/index.json     ["redis.json", ...]
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod extract;
pub mod fetch;
pub mod index;
pub mod pipeline;
pub mod publish;
pub mod record;
pub mod registry;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
