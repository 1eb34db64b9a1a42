//! Conversion between feature tables and model matrices

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::pipeline::{column_names, column_to_f64_vec, ensure_columns};

/// Ordered feature columns and the values that stand in for their nulls.
///
/// Fitted on the training features; nulls at prediction time take the
/// training mean of their column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub columns: Vec<String>,
    pub fill_values: Vec<f64>,
}

fn ensure_model_ready_columns(df: &DataFrame, columns: &[String]) -> Result<()> {
    ensure_columns(df, columns, "build feature matrix")?;
    for name in columns {
        let dtype = df.column(name)?.dtype();
        if !(dtype.is_primitive_numeric() || dtype == &DataType::Boolean) {
            return Err(PipelineError::config(format!(
                "feature column '{}' has type {}; encode or drop it before training",
                name, dtype
            )));
        }
    }
    Ok(())
}

impl FeatureLayout {
    /// Every column of `df`, in order, with its mean as fill value.
    pub fn fit(df: &DataFrame) -> Result<Self> {
        let columns = column_names(df);
        ensure_model_ready_columns(df, &columns)?;

        let mut fill_values = Vec::with_capacity(columns.len());
        for name in &columns {
            let present: Vec<f64> = column_to_f64_vec(df.column(name)?)?
                .into_iter()
                .flatten()
                .collect();
            let mean = if present.is_empty() {
                0.0
            } else {
                present.iter().sum::<f64>() / present.len() as f64
            };
            fill_values.push(mean);
        }

        Ok(Self {
            columns,
            fill_values,
        })
    }

    /// Row-major matrix of the layout columns, selected by name and in
    /// layout order. Extra columns in `df` are ignored.
    pub fn matrix(&self, df: &DataFrame) -> Result<Array2<f64>> {
        ensure_model_ready_columns(df, &self.columns)?;

        let rows = df.height();
        let mut x = Array2::<f64>::zeros((rows, self.columns.len()));
        for (j, (name, fill)) in self.columns.iter().zip(&self.fill_values).enumerate() {
            let values = column_to_f64_vec(df.column(name)?)?;
            for (i, value) in values.into_iter().enumerate() {
                x[[i, j]] = value.unwrap_or(*fill);
            }
        }
        Ok(x)
    }
}

/// Binary labels from a one-column target table. Only 0 and 1 are accepted.
pub fn labels(y: &DataFrame) -> Result<Array1<usize>> {
    let column = y
        .get_columns()
        .first()
        .ok_or_else(|| PipelineError::config("target table has no columns"))?;

    let values = column_to_f64_vec(column)?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            other => Err(PipelineError::Model(format!(
                "target '{}' must be 0 or 1, found {:?} at row {}",
                column.name(),
                other,
                row
            ))),
        })
        .collect::<Result<Vec<usize>>>()
        .map(Array1::from)
}
