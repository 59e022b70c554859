//! Repository index and chart archive fixtures.

use crate::index::{IndexDocument, VersionEntry};
use flate2::Compression;
use flate2::write::GzEncoder;

/// Builds `index.yaml` documents.
///
/// Versions of one chart keep the order in which they were added, which is
/// the order the publisher-order policy sees.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    document: IndexDocument,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self {
            document: IndexDocument {
                api_version: Some("v1".to_string()),
                entries: Default::default(),
            },
        }
    }

    /// Appends a version of `name` with a single download URL.
    pub fn chart(self, name: &str, version: &str, url: &str) -> Self {
        self.entry(
            name,
            VersionEntry {
                version: version.to_string(),
                description: format!("{name} chart"),
                download_urls: vec![url.to_string()],
                ..VersionEntry::default()
            },
        )
    }

    /// Appends a fully specified version of `name`.
    pub fn entry(mut self, name: &str, entry: VersionEntry) -> Self {
        self.document.entries.entry(name.to_string()).or_default().push(entry);
        self
    }

    /// Lists `name` with no versions at all.
    pub fn empty_chart(mut self, name: &str) -> Self {
        self.document.entries.entry(name.to_string()).or_default();
        self
    }

    /// Renders the index as YAML.
    pub fn build(&self) -> String {
        serde_yaml::to_string(&self.document)
            .unwrap_or_else(|e| panic!("Failed to render test index: {e}"))
    }
}

/// Gzip tar archive holding `files` as `(path, contents)` pairs.
pub fn chart_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, path, *contents)
            .unwrap_or_else(|e| panic!("Failed to append {path} to test archive: {e}"));
    }

    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .unwrap_or_else(|e| panic!("Failed to finish test archive: {e}"))
}

/// Archive laid out like `helm package` output: `{chart}/Chart.yaml` and
/// `{chart}/values.yaml`.
pub fn chart_archive_with_values(chart: &str, values: &str) -> Vec<u8> {
    let chart_yaml = format!("apiVersion: v2\nname: {chart}\nversion: 1.0.0\n");
    let chart_path = format!("{chart}/Chart.yaml");
    let values_path = format!("{chart}/values.yaml");
    chart_archive(&[
        (chart_path.as_str(), chart_yaml.as_bytes()),
        (values_path.as_str(), values.as_bytes()),
    ])
}
