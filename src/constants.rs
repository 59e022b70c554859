//! Global constants used throughout the helmvals codebase.
//!
//! File names of the repository protocol and of the published dataset, default
//! directories, network timeouts and retry parameters live here so the
//! defaults in [`crate::config`] and the tests agree on one value.

use std::time::Duration;

/// File name of a repository index, relative to the repository base URL.
pub const INDEX_FILE_NAME: &str = "index.yaml";

/// File name of the chart configuration extracted from each artifact.
pub const VALUES_FILE_NAME: &str = "values.yaml";

/// Consolidated dataset file, relative to a sink root.
pub const CONSOLIDATED_FILE_NAME: &str = "charts.json";

/// Directory holding per-chart record files, relative to a sink root.
pub const RECORDS_DIR_NAME: &str = "charts";

/// Manifest listing the per-chart record files, inside [`RECORDS_DIR_NAME`].
pub const MANIFEST_FILE_NAME: &str = "index.json";

/// Extension of artifacts in the scratch directory.
pub const ARTIFACT_EXTENSION: &str = "tgz";

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "helmvals.toml";

/// Default scratch directory for downloaded artifacts.
pub const DEFAULT_SCRATCH_DIR: &str = "temp";

/// Default root for unpacked charts and archival `values-{version}.yaml` copies.
pub const DEFAULT_EXTRACT_ROOT: &str = "data";

/// Default internal dataset sink.
pub const DEFAULT_INTERNAL_SINK: &str = "data";

/// Default public, statically served dataset sink.
pub const DEFAULT_PUBLIC_SINK: &str = "public/data";

/// Timeout for a single HTTP request, body included (5 minutes).
///
/// Artifacts can be tens of megabytes, so this is generous.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

/// Timeout for establishing a TCP/TLS connection.
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Total attempts (first try included) for transient network failures.
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// First backoff delay between attempts.
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 200;

/// Upper bound for a single backoff delay.
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Charts processed at once. One means strictly sequential.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Concurrent downloads allowed against a single repository.
pub const DEFAULT_PER_REPOSITORY_CONCURRENCY: usize = 2;

/// External tool used by the `external` extraction strategy.
pub const EXTERNAL_TAR_COMMAND: &str = "tar";
