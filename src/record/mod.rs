//! The published chart record.
//!
//! JSON field names are part of the consumer contract: `name`, `repo`,
//! `description`, `version`, `appVersion`, `values`, `url`, `createdAt`.

use crate::core::ChartSpec;
use crate::index::VersionEntry;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Date format of [`ChartRecord::created_at`].
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d";

/// One chart of the published dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRecord {
    /// Chart name as configured in the work list
    pub name: String,
    /// Repository name as configured in the work list
    pub repo: String,
    pub description: String,
    pub version: String,
    pub app_version: String,
    /// `values.yaml` exactly as shipped in the archive
    pub values: String,
    /// Project home page, else first source URL, else empty
    pub url: String,
    /// UTC day of ingestion, `YYYY-MM-DD`
    pub created_at: String,
}

/// Builds the record of `spec` dated today (UTC).
#[must_use]
pub fn assemble(spec: &ChartSpec, entry: &VersionEntry, values: String) -> ChartRecord {
    assemble_on(spec, entry, values, Utc::now().date_naive())
}

/// Builds the record of `spec` dated `date`.
#[must_use]
pub fn assemble_on(
    spec: &ChartSpec,
    entry: &VersionEntry,
    values: String,
    date: NaiveDate,
) -> ChartRecord {
    let url = Some(entry.home_url.as_str())
        .filter(|home| !home.is_empty())
        .or_else(|| entry.source_urls.first().map(String::as_str))
        .unwrap_or_default()
        .to_string();

    ChartRecord {
        name: spec.chart_name.clone(),
        repo: spec.repository_name.clone(),
        description: entry.description.clone(),
        version: entry.version.clone(),
        app_version: entry.app_version.clone(),
        values,
        url,
        created_at: date.format(CREATED_AT_FORMAT).to_string(),
    }
}
