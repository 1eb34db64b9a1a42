//! Missing value analysis and handling

use polars::prelude::*;
use tracing::{info, warn};

use super::columns::{column_to_f64_vec, ensure_columns, ensure_numeric_columns, filter_rows, replace_column};
use super::imputer::CustomImputer;
use crate::error::Result;

/// One way of dealing with missing cells.
pub enum MissingValueStrategy {
    /// Remove every row with a missing value in any of the critical columns.
    DropCritical { columns: Vec<String> },
    /// Replace missing values in one numeric column with the column mean.
    FillMean { column: String },
    /// Predict missing values of one column from auxiliary columns.
    Impute(CustomImputer),
}

impl MissingValueStrategy {
    pub fn handle(&self, df: DataFrame) -> Result<DataFrame> {
        match self {
            MissingValueStrategy::DropCritical { columns } => drop_missing_critical(df, columns),
            MissingValueStrategy::FillMean { column } => fill_with_mean(df, column),
            MissingValueStrategy::Impute(imputer) => imputer.impute(df).map(|(df, _)| df),
        }
    }
}

/// Per-column missing ratios, sorted descending.
pub fn analyze_missing_values(df: &DataFrame) -> Vec<(String, f64)> {
    if df.height() == 0 {
        return Vec::new();
    }

    let rows = df.height() as f64;
    let mut missing_ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count() as f64 / rows))
        .collect();

    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    missing_ratios
}

/// Drop rows having a null in any of `columns`. Other columns are not inspected.
pub fn drop_missing_critical(df: DataFrame, columns: &[String]) -> Result<DataFrame> {
    ensure_columns(&df, columns, "drop missing values")?;
    if columns.is_empty() {
        return Ok(df);
    }

    let mut keep = vec![true; df.height()];
    for name in columns {
        let valid = df.column(name)?.as_materialized_series().is_not_null();
        for (flag, is_valid) in keep.iter_mut().zip(&valid) {
            *flag &= is_valid.unwrap_or(false);
        }
    }

    let before = df.height();
    let cleaned = filter_rows(&df, &keep)?;
    info!(
        columns = ?columns,
        dropped = before - cleaned.height(),
        remaining = cleaned.height(),
        "dropped rows with missing critical values"
    );
    Ok(cleaned)
}

/// Fill nulls in `column` with the mean of its non-null values.
///
/// The mean is taken over the table passed in. A column without any
/// non-null value is left untouched.
pub fn fill_with_mean(df: DataFrame, column: &str) -> Result<DataFrame> {
    ensure_numeric_columns(&df, &[column], "fill missing values")?;

    let values = column_to_f64_vec(df.column(column)?)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        warn!(column, "column has no values to compute a mean from; left as is");
        return Ok(df);
    }

    let missing = values.len() - present.len();
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    let filled: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(mean)).collect();

    info!(column, mean, filled = missing, "filled missing values with mean");
    replace_column(df, Series::new(column.into(), filled))
}
