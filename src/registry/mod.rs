//! Repository registry and the built-in work list.
//!
//! The registry maps a repository name to its base URL. It is built once per
//! process from the built-in table, optionally extended or overridden by the
//! `[repositories]` table of the configuration file, and never mutated after
//! that.
//!
//! # Examples
//!
//! ```rust
//! use helmvals::registry::RepositoryRegistry;
//!
//! let registry = RepositoryRegistry::builtin();
//! let bitnami = registry.resolve("bitnami").unwrap();
//! assert_eq!(bitnami.base_url, "https://charts.bitnami.com/bitnami");
//! assert!(registry.resolve("nope").is_err());
//! ```

use crate::core::{ChartSpec, IngestError};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// A chart repository: a name and the base URL its index and artifacts live under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    /// Registry name (e.g. `bitnami`)
    pub name: String,
    /// Base URL, with or without a trailing slash
    pub base_url: String,
}

impl Repository {
    /// Create a repository entry.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }

    /// URL of `relative` under this repository's base URL.
    #[must_use]
    pub fn url_for(&self, relative: &str) -> String {
        join_url(&self.base_url, relative)
    }
}

/// Joins a relative path onto a base URL with exactly one `/` between them,
/// whether or not the base ends with a slash or the path starts with one.
#[must_use]
pub fn join_url(base: &str, relative: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), relative.trim_start_matches('/'))
}

const BUILTIN_REPOSITORIES: &[(&str, &str)] = &[
    ("bitnami", "https://charts.bitnami.com/bitnami"),
    ("ingress-nginx", "https://kubernetes.github.io/ingress-nginx"),
    ("prometheus-community", "https://prometheus-community.github.io/helm-charts"),
    ("grafana", "https://grafana.github.io/helm-charts"),
    ("jetstack", "https://charts.jetstack.io"),
    ("argo", "https://argoproj.github.io/argo-helm"),
];

// Several entries reference repositories that are not registered; they are
// reported as `repository-not-found` on every run until configured.
const BUILTIN_CHARTS: &[(&str, &str)] = &[
    ("fluentd", "fluent"),
    ("opensearch", "opensearch"),
    ("pinot", "apache"),
    ("kafka", "bitnami"),
    ("argo-cd", "argo"),
    ("nginx-ingress", "ingress-nginx"),
    ("redis", "bitnami"),
    ("mongodb", "bitnami"),
    ("postgresql", "bitnami"),
    ("prometheus", "prometheus-community"),
    ("airflow", "apache"),
    ("minio", "minio"),
];

/// The built-in work list, in processing order.
#[must_use]
pub fn builtin_charts() -> Vec<ChartSpec> {
    BUILTIN_CHARTS.iter().map(|(chart, repo)| ChartSpec::new(*chart, *repo)).collect()
}

/// Immutable lookup table from repository name to [`Repository`].
#[derive(Debug, Clone, Default)]
pub struct RepositoryRegistry {
    repositories: BTreeMap<String, Repository>,
}

impl RepositoryRegistry {
    /// Registry containing only the built-in repositories.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILTIN_REPOSITORIES
                .iter()
                .map(|(name, url)| ((*name).to_string(), (*url).to_string())),
        )
    }

    /// Registry built from arbitrary `(name, base_url)` pairs. Later pairs win.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let repositories = entries
            .into_iter()
            .map(|(name, base_url)| (name.clone(), Repository::new(name, base_url)))
            .collect();
        Self {
            repositories,
        }
    }

    /// Built-in repositories merged with `overrides`; overrides replace built-ins
    /// of the same name.
    #[must_use]
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut registry = Self::builtin();
        for (name, url) in overrides {
            registry.repositories.insert(name.clone(), Repository::new(name.clone(), url.clone()));
        }
        registry
    }

    /// Looks up a repository by name.
    pub fn resolve(&self, name: &str) -> Result<&Repository, IngestError> {
        self.repositories.get(name).ok_or_else(|| IngestError::RepositoryNotFound {
            name: name.to_string(),
        })
    }

    /// All repositories, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.values()
    }

    /// Number of registered repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}
