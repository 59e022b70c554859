//! Repository index documents and the per-run index cache.
//!
//! A repository publishes `index.yaml` at its base URL: a mapping from chart
//! name to the list of published versions, newest first by convention.
//!
//! [`IndexResolver`] downloads and parses each repository's index at most once
//! per run. The cache is safe to share between concurrent chart tasks and is
//! single-flight: when two charts of the same repository ask at the same time,
//! one request is made and both wait for it. Failures are cached as well, so an
//! unreachable repository costs one (retried) fetch per run, not one per chart.

use crate::config::RetryConfig;
use crate::constants::INDEX_FILE_NAME;
use crate::core::{IngestError, is_transient_status};
use crate::registry::Repository;
use crate::utils::retry_transient;
use dashmap::DashMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A parsed repository index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Index format version (`v1` for every known repository)
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Chart name to versions, newest first as published
    #[serde(default)]
    pub entries: HashMap<String, Vec<VersionEntry>>,
}

impl IndexDocument {
    /// Parse an index from YAML bytes.
    pub fn from_yaml(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(bytes)
    }

    /// Versions published for `chart`, in index order.
    #[must_use]
    pub fn versions(&self, chart: &str) -> Option<&[VersionEntry]> {
        self.entries.get(chart).map(Vec::as_slice)
    }
}

/// One published version of a chart.
///
/// Index files in the wild are loose: numeric-looking versions are sometimes
/// unquoted and optional lists are sometimes `null`. Scalars are therefore
/// accepted as strings and `null` lists as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Chart version
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    /// Version of the packaged application
    #[serde(rename = "appVersion", default, deserialize_with = "scalar_string")]
    pub app_version: String,
    /// One-line chart description
    #[serde(default, deserialize_with = "scalar_string")]
    pub description: String,
    /// Artifact locations, absolute or relative to the repository base URL
    #[serde(rename = "urls", default, deserialize_with = "string_list")]
    pub download_urls: Vec<String>,
    /// Project home page
    #[serde(rename = "home", default, deserialize_with = "scalar_string")]
    pub home_url: String,
    /// Source repositories
    #[serde(rename = "sources", default, deserialize_with = "string_list")]
    pub source_urls: Vec<String>,
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected a scalar, found {other:?}"))),
    }
}

fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(Vec::new()),
        serde_yaml::Value::Sequence(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_yaml::Value::String(s) => Some(Ok(s)),
                serde_yaml::Value::Null => None,
                other => Some(Err(D::Error::custom(format!("expected a string, found {other:?}")))),
            })
            .collect(),
        other => Err(D::Error::custom(format!("expected a list, found {other:?}"))),
    }
}

type CachedIndex = Result<Arc<IndexDocument>, IngestError>;

/// Fetches repository indexes, caching each one for the lifetime of the resolver.
///
/// Create one resolver per run; dropping it forgets every index.
pub struct IndexResolver {
    client: reqwest::Client,
    retry: RetryConfig,
    cache: DashMap<String, Arc<OnceCell<CachedIndex>>>,
    requests: AtomicUsize,
}

impl IndexResolver {
    /// Resolver using `client` for requests and `retry` for transient failures.
    #[must_use]
    pub fn new(client: reqwest::Client, retry: RetryConfig) -> Self {
        Self {
            client,
            retry,
            cache: DashMap::new(),
            requests: AtomicUsize::new(0),
        }
    }

    /// The index of `repository`, downloaded on first use and cached afterwards.
    ///
    /// # Errors
    ///
    /// - [`IngestError::IndexUnavailable`] on transport errors or non-success status
    /// - [`IngestError::IndexMalformed`] when the body is not a valid index
    ///
    /// Both outcomes are cached like successes.
    pub async fn fetch_index(&self, repository: &Repository) -> CachedIndex {
        // Clone the cell out so no map guard is held across the await.
        let cell = Arc::clone(self.cache.entry(repository.name.clone()).or_default().value());
        cell.get_or_init(|| self.download(repository)).await.clone()
    }

    /// Number of HTTP requests issued so far, retries included.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of repositories with a cached outcome.
    #[must_use]
    pub fn cached_repositories(&self) -> usize {
        self.cache.iter().filter(|entry| entry.value().initialized()).count()
    }

    async fn download(&self, repository: &Repository) -> CachedIndex {
        let url = repository.url_for(INDEX_FILE_NAME);
        debug!("Fetching index of '{}' from {}", repository.name, url);

        let body = retry_transient(&self.retry, &format!("index {url}"), || {
            self.request(repository, &url)
        })
        .await?;

        let size = body.len();
        let parsed = tokio::task::spawn_blocking(move || IndexDocument::from_yaml(&body))
            .await
            .map_err(|e| IngestError::IndexMalformed {
                repository: repository.name.clone(),
                reason: format!("parser task failed: {e}"),
            })?
            .map_err(|e| IngestError::IndexMalformed {
                repository: repository.name.clone(),
                reason: e.to_string(),
            })?;

        info!(
            "Loaded index of '{}': {} charts ({} bytes)",
            repository.name,
            parsed.entries.len(),
            size
        );
        Ok(Arc::new(parsed))
    }

    async fn request(&self, repository: &Repository, url: &str) -> Result<Vec<u8>, IngestError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let unavailable = |reason: String, transient: bool| IngestError::IndexUnavailable {
            repository: repository.name.clone(),
            url: url.to_string(),
            reason,
            transient,
        };

        let response =
            self.client.get(url).send().await.map_err(|e| unavailable(e.to_string(), true))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {status}"), is_transient_status(status)));
        }

        let bytes = response.bytes().await.map_err(|e| unavailable(e.to_string(), true))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::test_utils::IndexBuilder;

    fn resolver() -> IndexResolver {
        IndexResolver::new(reqwest::Client::new(), RetryConfig::disabled())
    }

    #[test]
    fn test_parse_loose_entries() {
        let yaml = br#"
apiVersion: v1
entries:
  redis:
    - version: 18.1.5
      appVersion: 7.2
      description: Redis
      urls:
        - redis-18.1.5.tgz
      home: https://redis.io
      sources: null
  empty: []
generated: "2023-10-01T00:00:00Z"
"#;
        let index = IndexDocument::from_yaml(yaml).unwrap();
        assert_eq!(index.api_version.as_deref(), Some("v1"));
        let redis = &index.versions("redis").unwrap()[0];
        assert_eq!(redis.version, "18.1.5");
        assert_eq!(redis.app_version, "7.2");
        assert_eq!(redis.download_urls, vec!["redis-18.1.5.tgz"]);
        assert!(redis.source_urls.is_empty());
        assert!(index.versions("empty").unwrap().is_empty());
        assert!(index.versions("missing").is_none());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let index = IndexDocument::from_yaml(b"entries:\n  a:\n    - version: 1.0.0\n").unwrap();
        let entry = &index.versions("a").unwrap()[0];
        assert_eq!(entry.description, "");
        assert_eq!(entry.home_url, "");
        assert!(entry.download_urls.is_empty());
    }

    #[tokio::test]
    async fn test_single_fetch_per_repository() {
        let mut server = mockito::Server::new_async().await;
        let body = IndexBuilder::new().chart("redis", "18.1.5", "redis-18.1.5.tgz").build();
        let mock = server
            .mock("GET", "/bitnami/index.yaml")
            .with_status(200)
            .with_body(body)
            .expect(1)
            .create_async()
            .await;

        let repo = Repository::new("bitnami", format!("{}/bitnami/", server.url()));
        let resolver = resolver();
        for _ in 0..3 {
            let index = resolver.fetch_index(&repo).await.unwrap();
            assert!(index.versions("redis").is_some());
        }

        mock.assert_async().await;
        assert_eq!(resolver.request_count(), 1);
        assert_eq!(resolver.cached_repositories(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let mut server = mockito::Server::new_async().await;
        let body = IndexBuilder::new().chart("kafka", "26.0.0", "kafka-26.0.0.tgz").build();
        let mock = server
            .mock("GET", "/index.yaml")
            .with_status(200)
            .with_body(body)
            .expect(1)
            .create_async()
            .await;

        let repo = Repository::new("bitnami", server.url());
        let resolver = resolver();
        let (a, b, c) = tokio::join!(
            resolver.fetch_index(&repo),
            resolver.fetch_index(&repo),
            resolver.fetch_index(&repo)
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unavailable_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock =
            server.mock("GET", "/index.yaml").with_status(404).expect(1).create_async().await;

        let repo = Repository::new("gone", server.url());
        let resolver = resolver();
        let first = resolver.fetch_index(&repo).await.unwrap_err();
        let second = resolver.fetch_index(&repo).await.unwrap_err();
        assert_eq!(first.kind(), ErrorKind::IndexUnavailable);
        assert!(!first.is_transient());
        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_index() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/index.yaml")
            .with_status(200)
            .with_body("entries: [this is: not: valid")
            .create_async()
            .await;

        let repo = Repository::new("broken", server.url());
        let err = resolver().fetch_index(&repo).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexMalformed);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock =
            server.mock("GET", "/index.yaml").with_status(503).expect(3).create_async().await;

        let repo = Repository::new("flaky", server.url());
        let resolver = IndexResolver::new(
            reqwest::Client::new(),
            RetryConfig {
                attempts: 3,
                initial_delay_ms: 1,
                max_delay_ms: 2,
            },
        );
        let err = resolver.fetch_index(&repo).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(resolver.request_count(), 3);
        mock.assert_async().await;
    }
}
