//! Artifact download into the scratch directory.
//!
//! Artifacts are streamed chunk by chunk to `{scratch}/{chart}-{version}.tgz`;
//! the body is never held in memory as a whole. The scratch directory has a
//! fixed location so repeated runs reuse it, but nothing relies on what a
//! previous run left there: an existing file of the same name is truncated.

use crate::config::RetryConfig;
use crate::constants::ARTIFACT_EXTENSION;
use crate::core::{IngestError, is_transient_status};
use crate::utils::fs::{ensure_dir_async, remove_file_if_exists};
use crate::utils::retry_transient;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Downloads chart artifacts to a scratch directory.
pub struct ArtifactFetcher {
    client: reqwest::Client,
    scratch_dir: PathBuf,
    retry: RetryConfig,
}

impl ArtifactFetcher {
    /// Fetcher writing into `scratch_dir`, created on first download.
    pub fn new(
        client: reqwest::Client,
        scratch_dir: impl Into<PathBuf>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            scratch_dir: scratch_dir.into(),
            retry,
        }
    }

    /// Scratch directory artifacts are written to.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Local path used for the artifact of `chart_name` at `version`.
    #[must_use]
    pub fn artifact_path(&self, chart_name: &str, version: &str) -> PathBuf {
        self.scratch_dir.join(format!("{chart_name}-{version}.{ARTIFACT_EXTENSION}"))
    }

    /// Streams `url` to the scratch file of `chart_name`/`version` and returns its path.
    ///
    /// # Errors
    ///
    /// [`IngestError::DownloadFailed`] on transport errors, non-success status,
    /// or local write failures. The partially written file is removed before
    /// returning.
    pub async fn fetch(
        &self,
        url: &str,
        chart_name: &str,
        version: &str,
    ) -> Result<PathBuf, IngestError> {
        ensure_dir_async(&self.scratch_dir).await.map_err(|e| IngestError::DownloadFailed {
            url: url.to_string(),
            reason: format!("cannot create scratch directory: {e:#}"),
            transient: false,
        })?;

        let path = self.artifact_path(chart_name, version);
        debug!("Downloading {} to {}", url, path.display());

        let result =
            retry_transient(&self.retry, &format!("download {url}"), || self.stream_to(url, &path))
                .await;

        match result {
            Ok(bytes) => {
                debug!("Downloaded {} bytes to {}", bytes, path.display());
                Ok(path)
            }
            Err(error) => {
                if let Err(cleanup) = remove_file_if_exists(&path).await {
                    warn!("Could not remove partial download {}: {cleanup:#}", path.display());
                }
                Err(error)
            }
        }
    }

    async fn stream_to(&self, url: &str, path: &Path) -> Result<u64, IngestError> {
        let failed = |reason: String, transient: bool| IngestError::DownloadFailed {
            url: url.to_string(),
            reason,
            transient,
        };

        let mut response =
            self.client.get(url).send().await.map_err(|e| failed(e.to_string(), true))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}"), is_transient_status(status)));
        }

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| failed(format!("cannot create {}: {e}", path.display()), false))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string(), true))? {
            file.write_all(&chunk)
                .await
                .map_err(|e| failed(format!("cannot write {}: {e}", path.display()), false))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| failed(format!("cannot flush {}: {e}", path.display()), false))?;

        Ok(written)
    }
}
