//! The `run` command: ingest the work list and publish the dataset.

use super::CliConfig;
use crate::config::{PipelineConfig, PublishLayout, SelectionPolicy};
use crate::core::HelmvalsError;
use crate::pipeline::{Pipeline, RunSummary};
use crate::utils::progress::is_progress_disabled;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct RunCommand {
    /// Files written to each sink
    #[arg(long, value_enum)]
    layout: Option<PublishLayout>,

    /// Number of charts processed at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// How the version of each chart is chosen
    #[arg(long, value_enum)]
    selection: Option<SelectionPolicy>,

    /// Output directory; repeat for several mirrored sinks. Replaces the configured sinks
    #[arg(long = "output", short = 'o', value_name = "DIR")]
    outputs: Vec<PathBuf>,
}

impl RunCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut config = cli.load_pipeline_config().await?;
        self.apply_overrides(&mut config);
        config.validate()?;

        let specs = config.work_list();
        let show_progress = !cli.no_progress && !is_progress_disabled();
        let pipeline = Pipeline::new(config)?.with_progress(show_progress);
        let summary = pipeline.run(&specs).await;

        print_summary(&summary);

        match summary.publish_error {
            Some(error) => Err(HelmvalsError::from(error).into()),
            None => Ok(()),
        }
    }

    fn apply_overrides(self, config: &mut PipelineConfig) {
        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(selection) = self.selection {
            config.selection = selection;
        }
        if !self.outputs.is_empty() {
            config.sinks = self.outputs;
            config.expand_paths();
        }
    }
}

fn print_summary(summary: &RunSummary) {
    for failure in &summary.failures {
        println!(
            "  {} {} [{}] {}",
            "✗".red(),
            failure.spec.to_string().bold(),
            failure.kind.to_string().yellow(),
            failure.cause
        );
    }

    let line = format!(
        "{} of {} charts ingested, {} published",
        summary.succeeded, summary.attempted, summary.published
    );
    if summary.is_success() {
        println!("{} {}", "✓".green(), line);
    } else {
        println!("{} {}", "✗".red(), line);
    }
}
