//! Version selection and artifact URL resolution.
//!
//! Two selection policies are available (see [`SelectionPolicy`]):
//!
//! - **publisher-order** (default): the first entry of the chart's list. Helm
//!   repositories publish versions newest first, and this policy trusts that.
//! - **highest-semver**: the highest stable semantic version. Pre-releases and
//!   versions that do not parse are skipped. If nothing parses, falls back to
//!   publisher order.
//!
//! # Examples
//!
//! ```rust
//! use helmvals::index::VersionEntry;
//! use helmvals::version::resolve_download_url;
//!
//! let entry = VersionEntry {
//!     version: "18.1.5".to_string(),
//!     download_urls: vec!["redis-18.1.5.tgz".to_string()],
//!     ..VersionEntry::default()
//! };
//! let url = resolve_download_url(&entry, "redis", "https://charts.bitnami.com/bitnami").unwrap();
//! assert_eq!(url, "https://charts.bitnami.com/bitnami/redis-18.1.5.tgz");
//! ```

use crate::config::SelectionPolicy;
use crate::core::IngestError;
use crate::index::{IndexDocument, VersionEntry};
use crate::registry::join_url;
use semver::Version;
use tracing::debug;

/// Picks the entry of `chart_name` to ingest.
///
/// # Errors
///
/// [`IngestError::ChartNotFound`] when the chart is not in the index or its
/// version list is empty.
pub fn select_version<'a>(
    index: &'a IndexDocument,
    chart_name: &str,
    repository_name: &str,
    policy: SelectionPolicy,
) -> Result<&'a VersionEntry, IngestError> {
    let not_found = || IngestError::ChartNotFound {
        chart: chart_name.to_string(),
        repository: repository_name.to_string(),
    };

    let versions = index.versions(chart_name).ok_or_else(not_found)?;
    let first = versions.first().ok_or_else(not_found)?;

    let selected = match policy {
        SelectionPolicy::PublisherOrder => first,
        SelectionPolicy::HighestSemver => highest_semver(versions).unwrap_or(first),
    };

    debug!(
        "Selected {chart_name} {} out of {} published versions ({:?})",
        selected.version,
        versions.len(),
        policy
    );
    Ok(selected)
}

fn highest_semver(versions: &[VersionEntry]) -> Option<&VersionEntry> {
    versions
        .iter()
        .filter_map(|entry| parse_version(&entry.version).map(|parsed| (parsed, entry)))
        .filter(|(parsed, _)| parsed.pre.is_empty())
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, entry)| entry)
}

fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).ok()
}

/// Absolute artifact URL for `entry`.
///
/// Takes the first URL of the entry. URLs with a scheme are returned
/// unchanged; anything else is joined to `base_url` with exactly one `/`.
///
/// # Errors
///
/// [`IngestError::NoDownloadUrl`] when the entry lists no URL.
pub fn resolve_download_url(
    entry: &VersionEntry,
    chart_name: &str,
    base_url: &str,
) -> Result<String, IngestError> {
    let raw = entry.download_urls.first().map(|url| url.trim()).filter(|url| !url.is_empty());
    let Some(raw) = raw else {
        return Err(IngestError::NoDownloadUrl {
            chart: chart_name.to_string(),
            version: entry.version.clone(),
        });
    };

    if has_scheme(raw) {
        Ok(raw.to_string())
    } else {
        Ok(join_url(base_url, raw))
    }
}

fn has_scheme(url: &str) -> bool {
    reqwest::Url::parse(url).is_ok_and(|parsed| !parsed.cannot_be_a_base())
}
