//! Command-line interface for helmvals.
//!
//! ```text
//! helmvals [run]     ingest the work list and publish the dataset (default)
//! helmvals list      show the effective work list, no network access
//! ```
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: configuration file (default: `helmvals.toml` if present)
//! - `--no-progress`: never draw the progress bar
//!
//! `RUST_LOG` overrides the level chosen by `--verbose`/`--quiet`.

mod list;
mod run;

use crate::config::PipelineConfig;
use crate::constants::DEFAULT_CONFIG_FILE;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Settings shared by every command, derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Disable the progress bar
    pub no_progress: bool,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Installs the global tracing subscriber. Later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(&self.log_level)
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Loads the pipeline configuration from `--config` or the default file.
    pub async fn load_pipeline_config(&self) -> Result<PipelineConfig> {
        PipelineConfig::load(self.config_path.as_deref(), Path::new(DEFAULT_CONFIG_FILE)).await
    }
}

#[derive(Parser)]
#[command(
    name = "helmvals",
    about = "Collect the default values.yaml of Helm charts into a browsable dataset",
    version,
    long_about = "helmvals resolves a list of Helm charts against their repositories, \
                  downloads the newest version of each and publishes its default \
                  configuration as JSON for a static catalogue site."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every chart and publish the dataset
    Run(run::RunCommand),

    /// Print the work list with resolved repository URLs
    List(list::ListCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Some(Commands::Run(cmd)) => cmd.execute(&config).await,
            Some(Commands::List(cmd)) => cmd.execute(&config).await,
            None => run::RunCommand::default().execute(&config).await,
        }
    }
}
