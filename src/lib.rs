//! Churnflow: customer-churn feature engineering and prediction
//!
//! A library for preparing raw customer tables (missing values, outliers,
//! binning, encoding, scaling), training a churn classifier, and replaying
//! the fitted pipeline on single records.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
