//! Pipeline orchestration.
//!
//! A run drives every chart of the work list through the stages
//!
//! ```text
//! registry -> index -> version -> fetch -> extract -> record
//! ```
//!
//! and hands the successful records to the publisher once, after every chart
//! was attempted. A failing stage drops only its chart: the failure is logged,
//! recorded in the [`RunSummary`] and the run moves on.
//!
//! # Concurrency
//!
//! `concurrency` charts are processed at once through a buffered stream, so
//! results come back in work-list order whatever the completion order. Within
//! a run, downloads against one repository are additionally bounded by
//! `per_repository_concurrency`. The index cache is shared by all tasks.
//!
//! Charts that resolve to the same artifact file (duplicate work-list entries)
//! share a scratch file and an extraction directory; their fetch and extract
//! stages are serialised behind a lock keyed by the artifact path.

use crate::config::{ExtractionStrategy, PipelineConfig};
use crate::core::{ChartSpec, ErrorKind, IngestError};
use crate::extract::{ArchiveExtractor, probe_external_tar};
use crate::fetch::ArtifactFetcher;
use crate::index::IndexResolver;
use crate::publish::{DatasetPublisher, is_publishable_name};
use crate::record::{ChartRecord, assemble};
use crate::registry::RepositoryRegistry;
use crate::utils::{ProgressBar, ensure_dir, is_safe_file_name};
use crate::version::{resolve_download_url, select_version};
use anyhow::{Context, Result};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{Instrument, debug, info, info_span, warn};

/// Why a chart was dropped from the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFailure {
    pub spec: ChartSpec,
    pub kind: ErrorKind,
    pub cause: IngestError,
}

/// Result of processing one chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartOutcome {
    Success(ChartRecord),
    Failure(ChartFailure),
}

/// Totals of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Charts in the work list
    pub attempted: usize,
    /// Charts that produced a record
    pub succeeded: usize,
    /// Records written by the publisher; 0 when publishing failed
    pub published: usize,
    /// Dropped charts, in work-list order
    pub failures: Vec<ChartFailure>,
    /// Set when the dataset could not be written
    pub publish_error: Option<IngestError>,
    /// Records handed to the publisher, in work-list order
    pub records: Vec<ChartRecord>,
}

impl RunSummary {
    /// Whether the dataset was published.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.publish_error.is_none()
    }
}

/// HTTP client carrying the configured timeouts and user agent.
pub fn build_http_client(config: &PipelineConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http_timeout())
        .connect_timeout(crate::constants::HTTP_CONNECT_TIMEOUT)
        .user_agent(config.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")
}

/// A configured ingestion pipeline.
///
/// Holds the per-run state (index cache, repository limits); build a new
/// pipeline for every run.
pub struct Pipeline {
    config: PipelineConfig,
    registry: RepositoryRegistry,
    resolver: IndexResolver,
    fetcher: ArtifactFetcher,
    extractor: ArchiveExtractor,
    publisher: DatasetPublisher,
    repository_limits: DashMap<String, Arc<Semaphore>>,
    artifact_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    show_progress: bool,
}

impl Pipeline {
    /// Pipeline for `config` with its own HTTP client.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let client = build_http_client(&config)?;
        Self::with_client(config, client)
    }

    /// Pipeline for `config` issuing requests through `client`.
    pub fn with_client(config: PipelineConfig, client: reqwest::Client) -> Result<Self> {
        config.validate()?;

        let external_available = match config.extraction {
            ExtractionStrategy::External => probe_external_tar(),
            ExtractionStrategy::Native => false,
        };

        Ok(Self {
            registry: config.registry(),
            resolver: IndexResolver::new(client.clone(), config.retry.clone()),
            fetcher: ArtifactFetcher::new(client, &config.scratch_dir, config.retry.clone()),
            extractor: ArchiveExtractor::new(
                &config.extract_root,
                config.extraction,
                external_available,
            ),
            publisher: DatasetPublisher::new(config.sinks.clone(), config.layout),
            repository_limits: DashMap::new(),
            artifact_locks: DashMap::new(),
            show_progress: false,
            config,
        })
    }

    /// Show a progress bar while charts are processed.
    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Index cache of this run.
    #[must_use]
    pub fn resolver(&self) -> &IndexResolver {
        &self.resolver
    }

    /// Processes `specs` and publishes the records that could be built.
    pub async fn run(&self, specs: &[ChartSpec]) -> RunSummary {
        self.prepare_directories();
        info!("Ingesting {} charts (concurrency {})", specs.len(), self.config.concurrency);

        let progress = ProgressBar::new(specs.len() as u64, self.show_progress);
        let outcomes: Vec<ChartOutcome> = stream::iter(specs)
            .map(|spec| {
                let progress = progress.clone();
                let span = info_span!(
                    "chart",
                    chart = %spec.chart_name,
                    repo = %spec.repository_name
                );
                async move {
                    progress.set_message(spec.to_string());
                    let outcome = self.process(spec).await;
                    progress.inc(1);
                    outcome
                }
                .instrument(span)
            })
            .buffered(self.config.concurrency)
            .collect()
            .await;
        progress.finish_and_clear();

        let mut summary = RunSummary {
            attempted: specs.len(),
            ..RunSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                ChartOutcome::Success(record) => summary.records.push(record),
                ChartOutcome::Failure(failure) => summary.failures.push(failure),
            }
        }
        summary.succeeded = summary.records.len();

        let (records, published) = self.publish(std::mem::take(&mut summary.records)).await;
        summary.records = records;
        match published {
            Ok(count) => summary.published = count,
            Err(error) => {
                warn!("{error}");
                summary.publish_error = Some(error);
            }
        }

        info!(
            "Run finished: {} attempted, {} succeeded, {} published, {} dropped",
            summary.attempted,
            summary.succeeded,
            summary.published,
            summary.failures.len()
        );
        summary
    }

    /// Runs one chart through every stage, turning a stage error into a failure.
    pub async fn process(&self, spec: &ChartSpec) -> ChartOutcome {
        match self.ingest(spec).await {
            Ok(record) => {
                info!("Ingested {} {}", spec, record.version);
                ChartOutcome::Success(record)
            }
            Err(cause) => {
                warn!("Dropping {}: {} ({})", spec, cause, cause.kind());
                ChartOutcome::Failure(ChartFailure {
                    spec: spec.clone(),
                    kind: cause.kind(),
                    cause,
                })
            }
        }
    }

    async fn ingest(&self, spec: &ChartSpec) -> Result<ChartRecord, IngestError> {
        if !is_publishable_name(&spec.chart_name) {
            return Err(unsafe_name(spec, "name", &spec.chart_name));
        }

        let repository = self.registry.resolve(&spec.repository_name)?;
        let index = self.resolver.fetch_index(repository).await?;
        let entry =
            select_version(&index, &spec.chart_name, &repository.name, self.config.selection)?;
        if !is_safe_file_name(&entry.version) {
            return Err(unsafe_name(spec, "version", &entry.version));
        }
        let url = resolve_download_url(entry, &spec.chart_name, &repository.base_url)?;

        let lock = self.artifact_lock(&spec.chart_name, &entry.version);
        let _guard = lock.lock().await;

        let artifact = {
            let limit = self.repository_limit(&repository.name);
            let _permit = limit.acquire().await.ok();
            self.fetcher.fetch(&url, &spec.chart_name, &entry.version).await?
        };

        let values = self.extractor.extract(&artifact, &spec.chart_name, &entry.version).await?;
        Ok(assemble(spec, entry, values))
    }

    fn artifact_lock(&self, chart_name: &str, version: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.artifact_locks
                .entry(self.fetcher.artifact_path(chart_name, version))
                .or_default()
                .value(),
        )
    }

    fn repository_limit(&self, repository: &str) -> Arc<Semaphore> {
        let permits = self.config.per_repository_concurrency;
        Arc::clone(
            self.repository_limits
                .entry(repository.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(permits)))
                .value(),
        )
    }

    async fn publish(
        &self,
        records: Vec<ChartRecord>,
    ) -> (Vec<ChartRecord>, Result<usize, IngestError>) {
        let publisher = self.publisher.clone();
        let sinks = publisher.sinks().iter().map(|s| s.display().to_string()).collect::<Vec<_>>();

        match tokio::task::spawn_blocking(move || {
            let result = publisher.publish(&records);
            (records, result)
        })
        .await
        {
            Ok(done) => done,
            Err(e) => (
                Vec::new(),
                Err(IngestError::PublishFailed {
                    sink: sinks.join(", "),
                    reason: format!("publish task failed: {e}"),
                }),
            ),
        }
    }

    fn prepare_directories(&self) {
        let dirs = [&self.config.scratch_dir, &self.config.extract_root]
            .into_iter()
            .chain(self.config.sinks.iter());
        for dir in dirs {
            if let Err(e) = ensure_dir(dir) {
                warn!("{e:#}");
            } else {
                debug!("Directory ready: {}", dir.display());
            }
        }
    }
}

fn unsafe_name(spec: &ChartSpec, field: &str, value: &str) -> IngestError {
    IngestError::UnsafeName {
        chart: spec.chart_name.clone(),
        field: field.to_string(),
        value: value.to_string(),
    }
}
