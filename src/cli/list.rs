//! The `list` command: show the effective work list.

use super::CliConfig;
use crate::core::ChartSpec;
use crate::registry::RepositoryRegistry;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

#[derive(Args, Debug, Default)]
pub struct ListCommand {
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ListedChart {
    name: String,
    repo: String,
    /// Repository base URL, absent when the repository is unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl ListCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_pipeline_config().await?;
        let listed = resolve(&config.work_list(), &config.registry());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&listed)?);
            return Ok(());
        }

        for chart in &listed {
            let location = match &chart.url {
                Some(url) => url.normal(),
                None => "(unknown repository)".yellow(),
            };
            println!("{:<24} {:<24} {}", chart.name.bold(), chart.repo, location);
        }
        println!("{} charts", listed.len());
        Ok(())
    }
}

fn resolve(specs: &[ChartSpec], registry: &RepositoryRegistry) -> Vec<ListedChart> {
    specs
        .iter()
        .map(|spec| ListedChart {
            name: spec.chart_name.clone(),
            repo: spec.repository_name.clone(),
            url: registry.resolve(&spec.repository_name).ok().map(|r| r.base_url.clone()),
        })
        .collect()
}
