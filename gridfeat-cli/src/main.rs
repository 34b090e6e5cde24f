//! Gridfeat CLI: run the feature pipeline once.
//!
//! Commands:
//! - `run`: load, join and enrich every configured source, write one CSV
//! - `config`: print the built-in CAISO pipeline as TOML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridfeat_runner::{run_pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "gridfeat",
    about = "Gridfeat CLI: hourly grid data alignment and feature pipeline"
)]
struct Cli {
    /// Log at debug level.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and print a JSON run summary.
    Run {
        /// Path to a TOML pipeline file. Defaults to the built-in CAISO pipeline.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the output CSV path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the built-in CAISO pipeline as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { config, output } => run_cmd(config, output),
        Commands::Config => {
            print!("{}", PipelineConfig::caiso_default().to_toml()?);
            Ok(())
        }
    }
}

fn run_cmd(config_path: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading pipeline {}", path.display()))?,
        None => {
            info!("no --config given, using the built-in CAISO pipeline");
            PipelineConfig::caiso_default()
        }
    };
    if let Some(path) = output {
        config.output.path = path;
    }

    let summary = run_pipeline(&config).context("pipeline run failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
