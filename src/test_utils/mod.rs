//! Test utilities for helmvals
//!
//! Helpers for building repository fixtures without a network: index documents
//! rendered to YAML and gzip tar chart archives built in memory. Pair them with
//! a `mockito` server to stand up a fake chart repository.
//!
//! # Example
//!
//! ```rust,no_run
//! use helmvals::test_utils::{IndexBuilder, chart_archive_with_values};
//!
//! let index = IndexBuilder::new().chart("redis", "18.1.5", "redis-18.1.5.tgz").build();
//! let archive = chart_archive_with_values("redis", "replicaCount: 1\n");
//! assert!(index.contains("redis-18.1.5.tgz"));
//! assert!(!archive.is_empty());
//! ```

pub mod fixtures;

pub use fixtures::{IndexBuilder, chart_archive, chart_archive_with_values};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=helmvals=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
