//! Chart archive extraction and `values.yaml` lookup.
//!
//! Each artifact is unpacked into `{extract_root}/{chart}/{chart}-{version}/`,
//! replacing whatever a previous run left there. Packaged charts normally
//! carry a single `{chart}/` directory, so `values.yaml` is looked up in this
//! order:
//!
//! 1. `{chart}/values.yaml`
//! 2. `values.yaml` at the archive root
//! 3. `values.yaml` in the only top-level directory of the archive
//!
//! The raw text is also kept as `{extract_root}/{chart}/values-{version}.yaml`.
//! The artifact itself is removed once the attempt is over, whatever its outcome.

use crate::config::ExtractionStrategy;
use crate::constants::{EXTERNAL_TAR_COMMAND, VALUES_FILE_NAME};
use crate::core::IngestError;
use crate::utils::fs::{atomic_write, remove_dir_all, remove_file_if_exists};
use crate::utils::platform::command_exists;
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Whether the external `tar` tool can be used for extraction.
#[must_use]
pub fn probe_external_tar() -> bool {
    let available = command_exists(EXTERNAL_TAR_COMMAND);
    debug!("External '{EXTERNAL_TAR_COMMAND}' available: {available}");
    available
}

/// Unpacks chart artifacts and reads their `values.yaml`.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    extract_root: PathBuf,
    strategy: ExtractionStrategy,
}

impl ArchiveExtractor {
    /// Extractor rooted at `extract_root`.
    ///
    /// `requested` is downgraded to [`ExtractionStrategy::Native`] when it asks
    /// for the external tool and `external_available` is false.
    pub fn new(
        extract_root: impl Into<PathBuf>,
        requested: ExtractionStrategy,
        external_available: bool,
    ) -> Self {
        let strategy = match requested {
            ExtractionStrategy::External if !external_available => {
                warn!(
                    "'{EXTERNAL_TAR_COMMAND}' not found on PATH, falling back to native extraction"
                );
                ExtractionStrategy::Native
            }
            other => other,
        };

        Self {
            extract_root: extract_root.into(),
            strategy,
        }
    }

    /// Strategy actually used.
    #[must_use]
    pub fn strategy(&self) -> ExtractionStrategy {
        self.strategy
    }

    #[must_use]
    pub fn extraction_dir(&self, chart_name: &str, version: &str) -> PathBuf {
        self.extract_root.join(chart_name).join(format!("{chart_name}-{version}"))
    }

    #[must_use]
    pub fn archived_values_path(&self, chart_name: &str, version: &str) -> PathBuf {
        self.extract_root.join(chart_name).join(format!("values-{version}.yaml"))
    }

    /// Unpacks `artifact` and returns the text of its `values.yaml`.
    ///
    /// # Errors
    ///
    /// - [`IngestError::ArchiveCorrupt`] when the archive cannot be unpacked or
    ///   the values file is not UTF-8
    /// - [`IngestError::ConfigurationFileMissing`] when no `values.yaml` exists
    ///   at the chart root
    pub async fn extract(
        &self,
        artifact: &Path,
        chart_name: &str,
        version: &str,
    ) -> Result<String, IngestError> {
        let result = self.extract_inner(artifact, chart_name, version).await;

        if let Err(e) = remove_file_if_exists(artifact).await {
            warn!("Could not remove artifact {}: {e:#}", artifact.display());
        }

        result
    }

    async fn extract_inner(
        &self,
        artifact: &Path,
        chart_name: &str,
        version: &str,
    ) -> Result<String, IngestError> {
        let target = self.extraction_dir(chart_name, version);
        let corrupt = |reason: String| IngestError::ArchiveCorrupt {
            path: artifact.display().to_string(),
            reason,
        };

        prepare_dir(&target).map_err(|e| corrupt(format!("{e:#}")))?;
        debug!("Extracting {} into {} ({:?})", artifact.display(), target.display(), self.strategy);

        match self.strategy {
            ExtractionStrategy::Native => {
                let source = artifact.to_path_buf();
                let dest = target.clone();
                tokio::task::spawn_blocking(move || unpack_native(&source, &dest))
                    .await
                    .map_err(|e| corrupt(format!("extraction task failed: {e}")))?
                    .map_err(|e| corrupt(e.to_string()))?;
            }
            ExtractionStrategy::External => {
                unpack_external(artifact, &target).await.map_err(corrupt)?;
            }
        }

        let Some(values_path) = locate_values(&target, chart_name) else {
            return Err(IngestError::ConfigurationFileMissing {
                chart: chart_name.to_string(),
                version: version.to_string(),
            });
        };

        let bytes = tokio::fs::read(&values_path)
            .await
            .map_err(|e| corrupt(format!("cannot read {}: {e}", values_path.display())))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| corrupt(format!("{} is not valid UTF-8", values_path.display())))?;

        let archived = self.archived_values_path(chart_name, version);
        if let Err(e) = atomic_write(&archived, text.as_bytes()) {
            warn!("Could not keep a copy of {}: {e:#}", values_path.display());
        }

        debug!("Read {} bytes from {}", text.len(), values_path.display());
        Ok(text)
    }
}

fn prepare_dir(target: &Path) -> anyhow::Result<()> {
    remove_dir_all(target)?;
    crate::utils::ensure_dir(target)
}

fn unpack_native(artifact: &Path, target: &Path) -> std::io::Result<()> {
    let file = File::open(artifact)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(false);
    archive.unpack(target)
}

async fn unpack_external(artifact: &Path, target: &Path) -> Result<(), String> {
    let output = tokio::process::Command::new(EXTERNAL_TAR_COMMAND)
        .arg("-xzf")
        .arg(artifact)
        .arg("-C")
        .arg(target)
        .output()
        .await
        .map_err(|e| format!("cannot run {EXTERNAL_TAR_COMMAND}: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{EXTERNAL_TAR_COMMAND} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

fn locate_values(root: &Path, chart_name: &str) -> Option<PathBuf> {
    let nested = root.join(chart_name).join(VALUES_FILE_NAME);
    if nested.is_file() {
        return Some(nested);
    }

    let flat = root.join(VALUES_FILE_NAME);
    if flat.is_file() {
        return Some(flat);
    }

    let mut dirs = std::fs::read_dir(root)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir());
    let only = dirs.next()?;
    if dirs.next().is_some() {
        return None;
    }

    let candidate = only.path().join(VALUES_FILE_NAME);
    candidate.is_file().then_some(candidate)
}
