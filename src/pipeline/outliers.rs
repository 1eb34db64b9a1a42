//! Interquartile-range outlier detection with a cross-column vote

use polars::prelude::*;
use tracing::{debug, info};

use super::columns::{column_to_f64_vec, ensure_numeric_columns, filter_rows};
use crate::error::{PipelineError, Result};

/// Tukey fences plus a per-row vote.
///
/// A value is flagged when it lies outside `[Q1 - k*IQR, Q3 + k*IQR]`.
/// A row is removed only when at least `min_flagged_columns` of the selected
/// columns flag it.
#[derive(Debug, Clone, Copy)]
pub struct OutlierDetector {
    pub multiplier: f64,
    pub min_flagged_columns: usize,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self {
            multiplier: 1.5,
            min_flagged_columns: 2,
        }
    }
}

/// Fence bounds computed for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Quantile with linear interpolation between order statistics.
///
/// `sorted` must be sorted ascending and non-empty; the position used is
/// `q * (n - 1)`.
pub fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

impl OutlierDetector {
    pub fn new(multiplier: f64, min_flagged_columns: usize) -> Self {
        Self {
            multiplier,
            min_flagged_columns,
        }
    }

    /// Fences for a column of values; `None` when the column has no values.
    pub fn bounds(&self, values: &[Option<f64>]) -> Option<IqrBounds> {
        let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile_linear(&sorted, 0.25);
        let q3 = quantile_linear(&sorted, 0.75);
        let iqr = q3 - q1;
        Some(IqrBounds {
            q1,
            q3,
            lower: q1 - self.multiplier * iqr,
            upper: q3 + self.multiplier * iqr,
        })
    }

    /// Flag matrix: one Boolean column per selected column, same height as `df`.
    ///
    /// Nulls are never flagged.
    pub fn detect<S: AsRef<str>>(&self, df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
        ensure_numeric_columns(df, columns, "detect outliers")?;

        let mut flag_columns = Vec::with_capacity(columns.len());
        for name in columns {
            let name = name.as_ref();
            let values = column_to_f64_vec(df.column(name)?)?;
            let flags: Vec<bool> = match self.bounds(&values) {
                Some(bounds) => {
                    debug!(
                        column = name,
                        q1 = bounds.q1,
                        q3 = bounds.q3,
                        lower = bounds.lower,
                        upper = bounds.upper,
                        "IQR bounds"
                    );
                    values
                        .iter()
                        .map(|v| v.is_some_and(|x| !bounds.contains(x)))
                        .collect()
                }
                None => vec![false; values.len()],
            };
            flag_columns.push(Series::new(name.into(), flags).into_column());
        }

        Ok(DataFrame::new(flag_columns)?)
    }

    /// Remove the rows flagged on at least `min_flagged_columns` columns.
    pub fn remove_flagged(&self, df: DataFrame, flags: &DataFrame) -> Result<DataFrame> {
        if flags.height() != df.height() {
            return Err(PipelineError::config(format!(
                "outlier flag matrix has {} rows, table has {}",
                flags.height(),
                df.height()
            )));
        }
        if flags.width() == 0 {
            return Ok(df);
        }

        let mut votes = vec![0usize; df.height()];
        for col in flags.get_columns() {
            for (vote, flagged) in votes.iter_mut().zip(col.bool()?) {
                if flagged.unwrap_or(false) {
                    *vote += 1;
                }
            }
        }

        let keep: Vec<bool> = votes
            .iter()
            .map(|&v| v < self.min_flagged_columns)
            .collect();

        let before = df.height();
        let cleaned = filter_rows(&df, &keep)?;
        info!(
            removed = before - cleaned.height(),
            remaining = cleaned.height(),
            min_flagged_columns = self.min_flagged_columns,
            "removed outlier rows"
        );
        Ok(cleaned)
    }

    pub fn remove_outliers<S: AsRef<str>>(&self, df: DataFrame, columns: &[S]) -> Result<DataFrame> {
        ensure_numeric_columns(&df, columns, "detect outliers")?;
        if columns.is_empty() || df.height() == 0 {
            return Ok(df);
        }
        let flags = self.detect(&df, columns)?;
        self.remove_flagged(df, &flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile_linear(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile_linear(&sorted, 0.75) - 3.25).abs() < 1e-12);
        assert_eq!(quantile_linear(&[5.0], 0.5), 5.0);
    }

    #[test]
    fn test_bounds_ignore_nulls() {
        let detector = OutlierDetector::default();
        let bounds = detector
            .bounds(&[Some(1.0), None, Some(2.0), Some(3.0), Some(4.0)])
            .unwrap();
        assert!((bounds.q1 - 1.75).abs() < 1e-12);
        assert!((bounds.lower - (1.75 - 1.5 * 1.5)).abs() < 1e-12);
        assert!(detector.bounds(&[None, None]).is_none());
    }
}
