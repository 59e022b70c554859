//! Chart identity used across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the work list: which chart to ingest and from which repository.
///
/// The repository is referenced by name; the [`crate::registry::RepositoryRegistry`]
/// resolves it to a base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Chart name as listed in the repository index (e.g. `redis`)
    #[serde(rename = "name")]
    pub chart_name: String,
    /// Repository name as registered in the registry (e.g. `bitnami`)
    #[serde(rename = "repo")]
    pub repository_name: String,
}

impl ChartSpec {
    /// Create a spec for `chart_name` in `repository_name`.
    pub fn new(chart_name: impl Into<String>, repository_name: impl Into<String>) -> Self {
        Self {
            chart_name: chart_name.into(),
            repository_name: repository_name.into(),
        }
    }
}

impl fmt::Display for ChartSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.repository_name, self.chart_name)
    }
}
