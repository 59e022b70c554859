//! Dataset publication to one or more sinks.
//!
//! Every sink receives the same files. Depending on [`PublishLayout`]:
//!
//! ```text
//! {sink}/charts.json            all records, work-list order
//! {sink}/charts/{name}.json     one record per chart
//! {sink}/charts/index.json      file names of the per-record files
//! ```
//!
//! Files are replaced atomically. Per-record files are written before the
//! manifest, and record files no longer listed in the manifest are removed
//! afterwards, so the manifest and the directory agree once a publish returns.

use crate::config::PublishLayout;
use crate::constants::{CONSOLIDATED_FILE_NAME, MANIFEST_FILE_NAME, RECORDS_DIR_NAME};
use crate::core::IngestError;
use crate::record::ChartRecord;
use crate::utils::fs::{atomic_write, ensure_dir, is_safe_file_name};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Writes the dataset to every configured sink.
#[derive(Debug, Clone)]
pub struct DatasetPublisher {
    sinks: Vec<PathBuf>,
    layout: PublishLayout,
}

impl DatasetPublisher {
    #[must_use]
    pub fn new(sinks: Vec<PathBuf>, layout: PublishLayout) -> Self {
        Self { sinks, layout }
    }

    #[must_use]
    pub fn sinks(&self) -> &[PathBuf] {
        &self.sinks
    }

    /// Publishes `records` to every sink and returns how many records were written.
    ///
    /// Every sink is attempted even when an earlier one fails. Files already
    /// written are left in place on failure.
    ///
    /// # Errors
    ///
    /// [`IngestError::PublishFailed`] when a chart name cannot be used as a
    /// file name or when any sink could not be written completely. The
    /// pipeline drops such charts before they reach the publisher, see
    /// [`is_publishable_name`].
    pub fn publish(&self, records: &[ChartRecord]) -> Result<usize, IngestError> {
        if let Some(bad) = records.iter().find(|r| !is_publishable_name(&r.name)) {
            return Err(IngestError::PublishFailed {
                sink: self.sink_list(),
                reason: format!("chart name '{}' cannot be used as a file name", bad.name),
            });
        }

        let exploded = latest_per_name(records);

        let mut failures = Vec::new();
        for sink in &self.sinks {
            match self.publish_to(sink, records, &exploded) {
                Ok(()) => debug!("Published {} records to {}", records.len(), sink.display()),
                Err(e) => {
                    warn!("Publishing to {} failed: {e:#}", sink.display());
                    failures.push((sink.display().to_string(), format!("{e:#}")));
                }
            }
        }

        if failures.is_empty() {
            info!("Published {} charts to {} sink(s)", records.len(), self.sinks.len());
            Ok(records.len())
        } else {
            let (sinks, reasons): (Vec<_>, Vec<_>) = failures.into_iter().unzip();
            Err(IngestError::PublishFailed {
                sink: sinks.join(", "),
                reason: reasons.join("; "),
            })
        }
    }

    fn sink_list(&self) -> String {
        self.sinks.iter().map(|s| s.display().to_string()).collect::<Vec<_>>().join(", ")
    }

    fn publish_to(
        &self,
        sink: &Path,
        records: &[ChartRecord],
        exploded: &[&ChartRecord],
    ) -> Result<()> {
        ensure_dir(sink)?;

        if self.layout.writes_consolidated() {
            let body = serde_json::to_vec_pretty(records).context("Failed to serialize dataset")?;
            atomic_write(&sink.join(CONSOLIDATED_FILE_NAME), &body)?;
        }

        if self.layout.writes_exploded() {
            write_exploded(&sink.join(RECORDS_DIR_NAME), exploded)?;
        }

        Ok(())
    }
}

fn write_exploded(dir: &Path, records: &[&ChartRecord]) -> Result<()> {
    ensure_dir(dir)?;

    let mut manifest = Vec::with_capacity(records.len());
    for record in records {
        let file_name = record_file_name(&record.name);
        let body = serde_json::to_vec_pretty(record)
            .with_context(|| format!("Failed to serialize record '{}'", record.name))?;
        atomic_write(&dir.join(&file_name), &body)?;
        manifest.push(file_name);
    }

    let body = serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;
    atomic_write(&dir.join(MANIFEST_FILE_NAME), &body)?;

    prune_stale(dir, &manifest)
}

fn prune_stale(dir: &Path, manifest: &[String]) -> Result<()> {
    let keep: HashSet<&str> = manifest.iter().map(String::as_str).collect();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory: {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name == MANIFEST_FILE_NAME || keep.contains(name) || !name.ends_with(".json") {
            continue;
        }
        if entry.path().is_file() {
            debug!("Removing stale record {}", entry.path().display());
            std::fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove stale record: {}", name))?;
        }
    }
    Ok(())
}

/// One record per chart name, in order of first appearance, holding the last
/// record seen for that name.
fn latest_per_name(records: &[ChartRecord]) -> Vec<&ChartRecord> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<&ChartRecord> = Vec::new();

    for record in records {
        match slots.get(record.name.as_str()) {
            Some(&slot) => {
                warn!("Chart '{}' appears more than once; keeping the last record", record.name);
                unique[slot] = record;
            }
            None => {
                slots.insert(record.name.as_str(), unique.len());
                unique.push(record);
            }
        }
    }
    unique
}

fn record_file_name(chart_name: &str) -> String {
    format!("{chart_name}.json")
}

/// Whether `name` can be used as `{name}.json` inside the records directory
/// without escaping it or replacing the manifest.
#[must_use]
pub fn is_publishable_name(name: &str) -> bool {
    is_safe_file_name(name) && record_file_name(name) != MANIFEST_FILE_NAME
}
