//! Full pipeline runs against a mocked chart repository.

use crate::common::{
    TestProject, assert_manifest_consistent, file_tree, read_consolidated, read_manifest,
};
use helmvals::config::{PipelineConfig, RetryConfig, SelectionPolicy};
use helmvals::core::{ChartSpec, ErrorKind};
use helmvals::index::VersionEntry;
use helmvals::pipeline::{Pipeline, RunSummary};
use helmvals::test_utils::{
    IndexBuilder, chart_archive, chart_archive_with_values, init_test_logging,
};
use std::collections::HashMap;

const REDIS_VALUES: &str = "## Redis(R) defaults\narchitecture: replication\nauth:\n  enabled: true\n  password: \"\"\n\n# trailing comment kept as-is\n";

fn config(project: &TestProject, repo_url: &str) -> PipelineConfig {
    PipelineConfig {
        scratch_dir: project.scratch_dir(),
        extract_root: project.internal_sink(),
        sinks: vec![project.internal_sink(), project.public_sink()],
        retry: RetryConfig::disabled(),
        repositories: HashMap::from([("mock".to_string(), format!("{repo_url}/charts"))]),
        ..PipelineConfig::default()
    }
}

async fn run(config: PipelineConfig, specs: &[ChartSpec]) -> RunSummary {
    Pipeline::new(config).unwrap().run(specs).await
}

#[tokio::test]
async fn test_mixed_outcomes_publish_only_successes() {
    init_test_logging(None);
    let mut server = mockito::Server::new_async().await;

    let index = IndexBuilder::new()
        .entry(
            "redis",
            VersionEntry {
                version: "18.1.5".into(),
                app_version: "7.2.1".into(),
                description: "Redis(R) is a key-value store".into(),
                download_urls: vec!["redis-18.1.5.tgz".into()],
                home_url: "https://bitnami.com".into(),
                source_urls: vec![],
            },
        )
        .chart("redis", "18.0.0", "redis-18.0.0.tgz")
        .chart("kafka", "26.0.0", "kafka-26.0.0.tgz")
        .chart("mongodb", "14.0.0", "mongodb-14.0.0.tgz")
        .build();
    let index_mock = server
        .mock("GET", "/charts/index.yaml")
        .with_body(index)
        .expect(1)
        .create_async()
        .await;
    let redis_mock = server
        .mock("GET", "/charts/redis-18.1.5.tgz")
        .with_body(chart_archive_with_values("redis", REDIS_VALUES))
        .expect(1)
        .create_async()
        .await;
    let _kafka =
        server.mock("GET", "/charts/kafka-26.0.0.tgz").with_status(404).create_async().await;
    let _mongodb = server
        .mock("GET", "/charts/mongodb-14.0.0.tgz")
        .with_body(chart_archive(&[("mongodb/Chart.yaml", b"name: mongodb\n".as_slice())]))
        .create_async()
        .await;

    let project = TestProject::new().unwrap();
    let specs = vec![
        ChartSpec::new("redis", "mock"),
        ChartSpec::new("kafka", "mock"),
        ChartSpec::new("postgresql", "mock"),
        ChartSpec::new("mongodb", "mock"),
        ChartSpec::new("fluentd", "fluent"),
    ];
    let summary = run(config(&project, &server.url()), &specs).await;

    index_mock.assert_async().await;
    redis_mock.assert_async().await;

    assert!(summary.is_success());
    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.published, 1);
    let kinds: Vec<_> =
        summary.failures.iter().map(|f| (f.spec.chart_name.as_str(), f.kind)).collect();
    assert_eq!(
        kinds,
        [
            ("kafka", ErrorKind::DownloadFailed),
            ("postgresql", ErrorKind::ChartNotFound),
            ("mongodb", ErrorKind::ConfigurationFileMissing),
            ("fluentd", ErrorKind::RepositoryNotFound),
        ]
    );

    for sink in [project.internal_sink(), project.public_sink()] {
        let records = read_consolidated(&sink);
        assert_eq!(records.len(), 1);
        let redis = &records[0];
        assert_eq!(redis.name, "redis");
        assert_eq!(redis.repo, "mock");
        assert_eq!(redis.version, "18.1.5");
        assert_eq!(redis.app_version, "7.2.1");
        assert_eq!(redis.url, "https://bitnami.com");
        assert_eq!(redis.values.as_bytes(), REDIS_VALUES.as_bytes());

        assert_eq!(read_manifest(&sink), ["redis.json"]);
        assert_manifest_consistent(&sink);
    }

    assert_eq!(
        std::fs::read(project.internal_sink().join("charts.json")).unwrap(),
        std::fs::read(project.public_sink().join("charts.json")).unwrap()
    );

    // Artifacts never outlive their attempt.
    let leftovers: Vec<_> = std::fs::read_dir(project.scratch_dir()).unwrap().collect();
    assert!(leftovers.is_empty(), "scratch not empty: {leftovers:?}");
    assert!(project.internal_sink().join("redis/values-18.1.5.yaml").exists());
}

#[tokio::test]
async fn test_rerun_produces_same_dataset() {
    let mut server = mockito::Server::new_async().await;
    let index = IndexBuilder::new()
        .chart("redis", "18.1.5", "redis-18.1.5.tgz")
        .chart("minio", "5.0.14", "minio-5.0.14.tgz")
        .build();
    let index_mock = server
        .mock("GET", "/charts/index.yaml")
        .with_body(index)
        .expect(2)
        .create_async()
        .await;
    let _redis = server
        .mock("GET", "/charts/redis-18.1.5.tgz")
        .with_body(chart_archive_with_values("redis", REDIS_VALUES))
        .create_async()
        .await;
    let _minio = server
        .mock("GET", "/charts/minio-5.0.14.tgz")
        .with_body(chart_archive_with_values("minio", "mode: standalone\n"))
        .create_async()
        .await;

    let project = TestProject::new().unwrap();
    let specs = vec![ChartSpec::new("redis", "mock"), ChartSpec::new("minio", "mock")];

    run(config(&project, &server.url()), &specs).await;
    let first = read_consolidated(&project.public_sink());
    let first_manifest = read_manifest(&project.public_sink());
    let first_trees = (file_tree(&project.internal_sink()), file_tree(&project.public_sink()));

    run(config(&project, &server.url()), &specs).await;
    let second = read_consolidated(&project.public_sink());
    let second_trees = (file_tree(&project.internal_sink()), file_tree(&project.public_sink()));

    let strip = |records: Vec<helmvals::record::ChartRecord>| {
        records
            .into_iter()
            .map(|mut r| {
                r.created_at.clear();
                r
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(first), strip(second));
    assert_eq!(first_trees, second_trees);
    assert!(first_trees.1.contains(&std::path::PathBuf::from("charts/minio.json")));
    assert!(first_trees.0.contains(&std::path::PathBuf::from("redis/values-18.1.5.yaml")));
    assert_eq!(first_manifest, read_manifest(&project.public_sink()));
    assert_manifest_consistent(&project.public_sink());
    index_mock.assert_async().await;
}

#[tokio::test]
async fn test_dropped_chart_disappears_from_exploded_set() {
    let mut server = mockito::Server::new_async().await;
    let _index = server
        .mock("GET", "/charts/index.yaml")
        .with_body(IndexBuilder::new().chart("redis", "18.1.5", "redis-18.1.5.tgz").build())
        .create_async()
        .await;
    let _redis = server
        .mock("GET", "/charts/redis-18.1.5.tgz")
        .with_body(chart_archive_with_values("redis", "a: 1\n"))
        .create_async()
        .await;

    let project = TestProject::new().unwrap();
    let stale = project.public_sink().join("charts/kafka.json");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "{}").unwrap();

    let summary = run(
        config(&project, &server.url()),
        &[ChartSpec::new("redis", "mock"), ChartSpec::new("kafka", "mock")],
    )
    .await;

    assert_eq!(summary.published, 1);
    assert!(!stale.exists());
    assert_manifest_consistent(&project.public_sink());
}

#[tokio::test]
async fn test_highest_semver_policy_downloads_newest() {
    let mut server = mockito::Server::new_async().await;
    let _index = server
        .mock("GET", "/charts/index.yaml")
        .with_body(
            IndexBuilder::new()
                .chart("argo-cd", "5.46.0", "argo-cd-5.46.0.tgz")
                .chart("argo-cd", "5.51.4", "argo-cd-5.51.4.tgz")
                .build(),
        )
        .create_async()
        .await;
    let newest = server
        .mock("GET", "/charts/argo-cd-5.51.4.tgz")
        .with_body(chart_archive_with_values("argo-cd", "server: {}\n"))
        .expect(1)
        .create_async()
        .await;

    let project = TestProject::new().unwrap();
    let mut cfg = config(&project, &server.url());
    cfg.selection = SelectionPolicy::HighestSemver;
    let summary = run(cfg, &[ChartSpec::new("argo-cd", "mock")]).await;

    newest.assert_async().await;
    assert_eq!(summary.records[0].version, "5.51.4");
}

#[tokio::test]
async fn test_unreachable_index_fails_every_chart_of_repository_once() {
    let mut server = mockito::Server::new_async().await;
    let index = server
        .mock("GET", "/charts/index.yaml")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let project = TestProject::new().unwrap();
    let specs = vec![
        ChartSpec::new("redis", "mock"),
        ChartSpec::new("kafka", "mock"),
        ChartSpec::new("mongodb", "mock"),
    ];
    let mut cfg = config(&project, &server.url());
    cfg.concurrency = 3;
    let summary = run(cfg, &specs).await;

    index.assert_async().await;
    assert_eq!(summary.failures.len(), 3);
    assert!(summary.failures.iter().all(|f| f.kind == ErrorKind::IndexUnavailable));
    assert!(summary.is_success());
    assert!(read_consolidated(&project.internal_sink()).is_empty());
}
