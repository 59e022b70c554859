//! Configuration for pipeline runs.
//!
//! helmvals needs no configuration: invoked without a file it uses the
//! built-in registry, the built-in work list and the default directories. A
//! `helmvals.toml` in the working directory, or a file passed with `--config`,
//! overrides any subset of the settings.
//!
//! # Precedence
//!
//! 1. CLI flags (`--layout`, `--concurrency`, `--selection`, `--output`)
//! 2. Configuration file
//! 3. Built-in defaults from [`crate::constants`]
//!
//! See [`PipelineConfig`] for the file format.

pub mod pipeline;

pub use pipeline::{
    ExtractionStrategy, PipelineConfig, PublishLayout, RetryConfig, SelectionPolicy,
};
