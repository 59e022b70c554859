//! Shared helpers for the integration tests.

use anyhow::{Context, Result};
use assert_cmd::Command;
use helmvals::record::ChartRecord;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary working directory with the default helmvals layout underneath.
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    root: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().to_path_buf();
        Ok(Self {
            _temp_dir: temp_dir,
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn internal_sink(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn public_sink(&self) -> PathBuf {
        self.root.join("public/data")
    }

    /// Writes `helmvals.toml` in the project directory.
    pub fn write_config(&self, content: &str) -> Result<()> {
        let path = self.root.join("helmvals.toml");
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// The helmvals binary, running in the project directory without colours or progress.
    pub fn helmvals(&self) -> Command {
        let mut cmd = Command::cargo_bin("helmvals").expect("helmvals binary is built");
        cmd.current_dir(&self.root)
            .env("NO_COLOR", "1")
            .env("HELMVALS_NO_PROGRESS", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// `helmvals.toml` body using `repo_url` as repository `mock` for `charts`.
pub fn mock_config(repo_url: &str, charts: &[&str]) -> String {
    let mut config = format!("[retry]\nattempts = 1\n\n[repositories]\nmock = \"{repo_url}\"\n");
    for chart in charts {
        config.push_str(&format!("\n[[charts]]\nname = \"{chart}\"\nrepo = \"mock\"\n"));
    }
    config
}

/// Records of `{sink}/charts.json`.
pub fn read_consolidated(sink: &Path) -> Vec<ChartRecord> {
    let body = fs::read_to_string(sink.join("charts.json")).expect("charts.json exists");
    serde_json::from_str(&body).expect("charts.json is valid")
}

/// File names listed in `{sink}/charts/index.json`.
pub fn read_manifest(sink: &Path) -> Vec<String> {
    let body = fs::read_to_string(sink.join("charts/index.json")).expect("index.json exists");
    serde_json::from_str(&body).expect("index.json is valid")
}

/// Asserts that every manifest entry exists and every record file is listed.
pub fn assert_manifest_consistent(sink: &Path) {
    let listed: BTreeSet<String> = read_manifest(sink).into_iter().collect();
    let on_disk: BTreeSet<String> = fs::read_dir(sink.join("charts"))
        .expect("charts directory exists")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".json") && name != "index.json")
        .collect();
    assert_eq!(listed, on_disk, "manifest and records differ in {}", sink.display());
}

/// Every file below `dir` as a path relative to `dir`, sorted.
pub fn file_tree(dir: &Path) -> Vec<PathBuf> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        for entry in fs::read_dir(dir).expect("directory is readable") {
            let path = entry.expect("directory entry is readable").path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                out.push(path.strip_prefix(base).expect("path is below base").to_path_buf());
            }
        }
    }

    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
