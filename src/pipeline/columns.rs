//! Column access helpers shared by the pipeline stages

use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Fail fast when any of `columns` is absent from `df`.
///
/// Stages call this before touching a single row so that a bad column
/// reference in the configuration never surfaces halfway through a batch.
pub fn ensure_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S], stage: &str) -> Result<()> {
    let missing: Vec<&str> = columns
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| df.column(c).is_err())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::config(format!(
            "{}: column(s) {:?} not found. Available columns: {:?}",
            stage,
            missing,
            column_names(df)
        )))
    }
}

/// Like [`ensure_columns`], additionally requiring a numeric dtype.
pub fn ensure_numeric_columns<S: AsRef<str>>(
    df: &DataFrame,
    columns: &[S],
    stage: &str,
) -> Result<()> {
    ensure_columns(df, columns, stage)?;
    for name in columns {
        let col = df.column(name.as_ref())?;
        if !col.dtype().is_primitive_numeric() {
            return Err(PipelineError::config(format!(
                "{}: column '{}' must be numeric, found {}",
                stage,
                name.as_ref(),
                col.dtype()
            )));
        }
    }
    Ok(())
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Numeric view of a column; nulls stay `None`.
pub fn column_to_f64_vec(col: &Column) -> Result<Vec<Option<f64>>> {
    let cast = col.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Categorical view of a column, used wherever values are compared as labels.
///
/// Floats are rendered with `{}` so that `1.0` and `1` produce the same key.
pub fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// Keep the rows whose entry in `keep` is true.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), keep);
    Ok(df.filter(&mask)?)
}

/// Drop the named columns that are present, ignoring the rest.
pub fn drop_present(df: DataFrame, columns: &[String]) -> DataFrame {
    let present: Vec<&str> = columns
        .iter()
        .map(|c| c.as_str())
        .filter(|c| df.column(c).is_ok())
        .collect();
    if present.is_empty() {
        df
    } else {
        df.drop_many(present)
    }
}

/// Replace (or append) a column in an owned frame.
pub fn replace_column(mut df: DataFrame, series: Series) -> Result<DataFrame> {
    df.with_column(series)?;
    Ok(df)
}
