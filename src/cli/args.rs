//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Churnflow - prepare customer data, train a churn model, and score records
#[derive(Parser, Debug)]
#[command(name = "churnflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pipeline configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml", global = true)]
    pub config: PathBuf,

    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true, value_parser = validate_log_level)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the data pipeline and cache the train/test split
    Data {
        /// Rebuild the split even when cached artifacts exist
        #[arg(long, default_value = "false")]
        force_rebuild: bool,
    },

    /// Run the data pipeline, train the classifier, and evaluate it
    Train {
        /// Rebuild the split even when cached artifacts exist
        #[arg(long, default_value = "false")]
        force_rebuild: bool,
    },

    /// Score one customer record with the trained model
    Predict {
        /// Record as a JSON object, e.g. '{"CreditScore": 619, "Geography": "France"}'
        #[arg(long, conflicts_with = "record_file", required_unless_present = "record_file")]
        record: Option<String>,

        /// File holding the record as a JSON object
        #[arg(long)]
        record_file: Option<PathBuf>,
    },
}

/// Validator for the log level flag
fn validate_log_level(s: &str) -> Result<String, String> {
    let level = s.to_lowercase();
    match level.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" => Ok(level),
        _ => Err(format!(
            "'{}' is not a log level (error, warn, info, debug, trace)",
            s
        )),
    }
}
