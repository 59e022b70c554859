//! Pipeline configuration.
//!
//! Replaces process-wide directory globals with one explicit value passed to
//! the orchestrator. Every field has a default, so an absent configuration file
//! reproduces the built-in behaviour: sequential processing, publisher-order
//! version selection, native extraction, and a dataset mirrored to `data/` and
//! `public/data/`.
//!
//! # File Format (`helmvals.toml`)
//!
//! ```toml
//! scratch_dir = "temp"
//! extract_root = "data"
//! sinks = ["data", "public/data"]
//! layout = "both"              # consolidated | exploded | both
//! selection = "publisher-order" # publisher-order | highest-semver
//! extraction = "native"        # native | external
//! concurrency = 4
//! per_repository_concurrency = 2
//! http_timeout_secs = 300
//!
//! [retry]
//! attempts = 3
//! initial_delay_ms = 200
//! max_delay_ms = 5000
//!
//! [repositories]
//! fluent = "https://fluent.github.io/helm-charts"
//!
//! [[charts]]
//! name = "redis"
//! repo = "bitnami"
//! ```

use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_EXTRACT_ROOT, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_INTERNAL_SINK,
    DEFAULT_PER_REPOSITORY_CONCURRENCY, DEFAULT_PUBLIC_SINK, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_INITIAL_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_SCRATCH_DIR,
};
use crate::core::{ChartSpec, HelmvalsError};
use crate::registry::{RepositoryRegistry, builtin_charts};
use crate::utils::platform::expand_path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Which dataset files a sink receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PublishLayout {
    /// Single `charts.json` with every record
    Consolidated,
    /// `charts/{name}.json` per record plus `charts/index.json`
    Exploded,
    /// Both of the above
    #[default]
    Both,
}

impl PublishLayout {
    /// Whether `charts.json` is written.
    #[must_use]
    pub const fn writes_consolidated(self) -> bool {
        matches!(self, Self::Consolidated | Self::Both)
    }

    /// Whether the per-record files and manifest are written.
    #[must_use]
    pub const fn writes_exploded(self) -> bool {
        matches!(self, Self::Exploded | Self::Both)
    }
}

/// How the version to ingest is chosen from a chart's index entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// First entry of the list, trusting the publisher's newest-first ordering
    #[default]
    PublisherOrder,
    /// Highest stable semantic version, falling back to publisher order
    HighestSemver,
}

/// How artifacts are unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    /// In-process gzip + tar decoding
    #[default]
    Native,
    /// `tar -xzf` subprocess; requires `tar` on PATH
    External,
}

/// Retry settings for transient network failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub attempts: usize,
    /// First backoff delay in milliseconds
    pub initial_delay_ms: u64,
    /// Cap for a single backoff delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            initial_delay_ms: DEFAULT_RETRY_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            attempts: 1,
            initial_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Backoff delays between attempts: `attempts - 1` exponentially growing
    /// delays, each capped at `max_delay_ms`.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        tokio_retry::strategy::ExponentialBackoff::from_millis(2)
            .factor(self.initial_delay_ms.max(1) / 2)
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .take(self.attempts.saturating_sub(1))
    }
}

/// Complete configuration of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory for downloaded artifacts; reused across runs
    pub scratch_dir: PathBuf,
    /// Root for unpacked charts and archival `values-{version}.yaml` copies
    pub extract_root: PathBuf,
    /// Dataset sinks, kept as exact mirrors of each other
    pub sinks: Vec<PathBuf>,
    /// Files written to each sink
    pub layout: PublishLayout,
    /// Version selection policy
    pub selection: SelectionPolicy,
    /// Extraction strategy
    pub extraction: ExtractionStrategy,
    /// Charts processed at once; 1 is strictly sequential
    pub concurrency: usize,
    /// Concurrent downloads against one repository
    pub per_repository_concurrency: usize,
    /// Per-request timeout in seconds
    pub http_timeout_secs: u64,
    /// User-Agent header for every request
    pub user_agent: String,
    /// Retry settings for transient failures
    pub retry: RetryConfig,
    /// Extra or overriding repositories (name → base URL)
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub repositories: HashMap<String, String>,
    /// Work list replacing the built-in one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<ChartSpec>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            extract_root: PathBuf::from(DEFAULT_EXTRACT_ROOT),
            sinks: vec![PathBuf::from(DEFAULT_INTERNAL_SINK), PathBuf::from(DEFAULT_PUBLIC_SINK)],
            layout: PublishLayout::default(),
            selection: SelectionPolicy::default(),
            extraction: ExtractionStrategy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            per_repository_concurrency: DEFAULT_PER_REPOSITORY_CONCURRENCY,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: format!("helmvals/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
            repositories: HashMap::new(),
            charts: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one, `default_file`
    /// is used when present and the built-in defaults otherwise.
    pub async fn load(path: Option<&Path>, default_file: &Path) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(HelmvalsError::ConfigNotFound {
                        path: path.display().to_string(),
                    }
                    .into());
                }
                Self::load_from(path).await
            }
            None if default_file.exists() => Self::load_from(default_file).await,
            None => Ok(Self::default()),
        }
    }

    /// Load, expand and validate a configuration file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(HelmvalsError::from)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Expand `~` and environment variables in every configured path.
    pub fn expand_paths(&mut self) {
        self.scratch_dir = expand_path(&self.scratch_dir.to_string_lossy());
        self.extract_root = expand_path(&self.extract_root.to_string_lossy());
        self.sinks = self.sinks.iter().map(|sink| expand_path(&sink.to_string_lossy())).collect();
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), HelmvalsError> {
        let invalid = |message: &str| {
            Err(HelmvalsError::ConfigError {
                message: message.to_string(),
            })
        };

        if self.concurrency == 0 {
            return invalid("concurrency must be at least 1");
        }
        if self.per_repository_concurrency == 0 {
            return invalid("per_repository_concurrency must be at least 1");
        }
        if self.sinks.is_empty() {
            return invalid("at least one sink is required");
        }
        if self.retry.attempts == 0 {
            return invalid("retry.attempts must be at least 1");
        }
        Ok(())
    }

    /// The effective registry: built-ins plus `[repositories]` overrides.
    #[must_use]
    pub fn registry(&self) -> RepositoryRegistry {
        RepositoryRegistry::with_overrides(&self.repositories)
    }

    /// The effective work list: `[[charts]]` when given, the built-in list otherwise.
    #[must_use]
    pub fn work_list(&self) -> Vec<ChartSpec> {
        self.charts.clone().unwrap_or_else(builtin_charts)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
