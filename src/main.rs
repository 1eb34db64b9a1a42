//! Churnflow CLI
//!
//! Runs the data pipeline, trains and evaluates the churn model, or scores
//! a single record against the persisted artifacts.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use churnflow::cli::{read_record, run_data, run_predict, run_train, Cli, Commands};
use churnflow::utils::{print_banner, print_completion, print_config, print_step_time};
use churnflow::PipelineConfig;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    // Loaded once and shared by every stage
    let config = PipelineConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    match &cli.command {
        Commands::Data { force_rebuild } => {
            print_banner(env!("CARGO_PKG_VERSION"));
            print_config(&cli.config, &config);
            let start = Instant::now();
            run_data(&config, *force_rebuild)?;
            print_step_time(start.elapsed());
            print_completion("Data pipeline complete!");
        }
        Commands::Train { force_rebuild } => {
            print_banner(env!("CARGO_PKG_VERSION"));
            print_config(&cli.config, &config);
            let start = Instant::now();
            run_train(&config, *force_rebuild)?;
            print_step_time(start.elapsed());
            print_completion("Training complete!");
        }
        Commands::Predict {
            record,
            record_file,
        } => {
            let record = read_record(record.as_deref(), record_file.as_deref())?;
            run_predict(&config, &record)?;
        }
    }

    Ok(())
}
