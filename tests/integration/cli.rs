//! The `helmvals` binary: commands, output and exit codes.

use crate::common::{TestProject, assert_manifest_consistent, mock_config, read_consolidated};
use helmvals::test_utils::{IndexBuilder, chart_archive_with_values};
use predicates::prelude::*;

#[test]
fn test_list_shows_builtin_work_list() {
    let project = TestProject::new().unwrap();
    project
        .helmvals()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("redis"))
        .stdout(predicate::str::contains("https://charts.bitnami.com/bitnami"))
        .stdout(predicate::str::contains("(unknown repository)"))
        .stdout(predicate::str::contains("12 charts"));
}

#[test]
fn test_list_json_uses_configured_charts() {
    let project = TestProject::new().unwrap();
    project.write_config(&mock_config("http://localhost:1234/repo", &["redis", "kafka"])).unwrap();

    let output = project.helmvals().args(["list", "--json"]).assert().success();
    let listed: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();

    assert_eq!(listed.as_array().unwrap().len(), 2);
    assert_eq!(listed[0]["name"], "redis");
    assert_eq!(listed[0]["repo"], "mock");
    assert_eq!(listed[0]["url"], "http://localhost:1234/repo");
}

#[test]
fn test_missing_config_file_exits_non_zero() {
    let project = TestProject::new().unwrap();
    project
        .helmvals()
        .args(["--config", "missing.toml", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn test_invalid_config_rejected() {
    let project = TestProject::new().unwrap();
    project.write_config("concurrency = 0\n").unwrap();
    project
        .helmvals()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_run_publishes_dataset() {
    let mut server = mockito::Server::new();
    let _index = server
        .mock("GET", "/index.yaml")
        .with_body(
            IndexBuilder::new()
                .chart("redis", "18.1.5", "redis-18.1.5.tgz")
                .chart("kafka", "26.0.0", "kafka-26.0.0.tgz")
                .build(),
        )
        .create();
    let _redis = server
        .mock("GET", "/redis-18.1.5.tgz")
        .with_body(chart_archive_with_values("redis", "replicaCount: 3\n"))
        .create();
    let _kafka = server.mock("GET", "/kafka-26.0.0.tgz").with_status(404).create();

    let project = TestProject::new().unwrap();
    project.write_config(&mock_config(&server.url(), &["redis", "kafka"])).unwrap();

    project
        .helmvals()
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 2 charts ingested, 1 published"))
        .stdout(predicate::str::contains("mock/kafka"));

    for sink in [project.internal_sink(), project.public_sink()] {
        let records = read_consolidated(&sink);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].values, "replicaCount: 3\n");
        assert_manifest_consistent(&sink);
    }
}

#[test]
fn test_run_with_output_and_layout_flags() {
    let mut server = mockito::Server::new();
    let _index = server
        .mock("GET", "/index.yaml")
        .with_body(IndexBuilder::new().chart("minio", "5.0.14", "minio-5.0.14.tgz").build())
        .create();
    let _minio = server
        .mock("GET", "/minio-5.0.14.tgz")
        .with_body(chart_archive_with_values("minio", "mode: standalone\n"))
        .create();

    let project = TestProject::new().unwrap();
    project.write_config(&mock_config(&server.url(), &["minio"])).unwrap();

    project
        .helmvals()
        .args(["run", "--layout", "consolidated", "--output", "site", "--concurrency", "2"])
        .assert()
        .success();

    let site = project.path().join("site");
    assert_eq!(read_consolidated(&site).len(), 1);
    assert!(!site.join("charts").exists());
    assert!(!project.public_sink().join("charts.json").exists());
}

#[test]
fn test_publish_failure_exits_non_zero() {
    let mut server = mockito::Server::new();
    let _index = server
        .mock("GET", "/index.yaml")
        .with_body(IndexBuilder::new().build())
        .create();

    let project = TestProject::new().unwrap();
    project.write_config(&mock_config(&server.url(), &["redis"])).unwrap();
    std::fs::write(project.path().join("blocked"), "not a directory").unwrap();

    project
        .helmvals()
        .args(["run", "--output", "blocked"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("0 of 1 charts ingested"));
}
