//! Error types for the churn pipeline.
//!
//! Stage-level structural failures propagate to the caller untouched.
//! Per-row imputation failures and per-value category misses are recovered
//! locally by the stage that hit them.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors that can occur while preparing data, training, or replaying.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unknown or missing column reference, or an invalid configuration value.
    ///
    /// Raised before a stage processes any row.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The ingestion source could not be read or parsed.
    #[error("Failed to ingest '{}': {reason}", path.display())]
    Ingestion { path: PathBuf, reason: String },

    /// Learned state (scaler, classifier, encoders) was requested before
    /// the step that produces it ran.
    #[error("{component} is not ready: {hint}")]
    NotFitted {
        component: &'static str,
        hint: &'static str,
    },

    /// The predictor could not produce a value for one row.
    ///
    /// Handled inside the imputation stage; the row keeps its missing value.
    #[error("Imputation failed for row {row}: {reason}")]
    Imputation { row: usize, reason: String },

    /// A persisted model or encoder file is missing at replay time.
    #[error("Artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    /// A persisted artifact could not be written, read, or decoded.
    #[error("Artifact error at '{}': {reason}", path.display())]
    Artifact { path: PathBuf, reason: String },

    /// The classifier failed to fit or predict.
    #[error("Model error: {0}")]
    Model(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl PipelineError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, PipelineError>;
