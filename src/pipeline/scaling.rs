//! Feature scaling with retained fitted state

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::columns::{column_to_f64_vec, ensure_numeric_columns, replace_column};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStrategy {
    /// `(x - min) / (max - min)`
    #[default]
    MinMax,
    /// `(x - mean) / std`, population standard deviation
    Standard,
}

/// Learned parameters, replayable on new data without refitting.
///
/// `params` holds `(min, max)` for min-max scaling and `(mean, std)` for
/// standard scaling. A degenerate column (zero spread) scales to 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    pub strategy: ScalingStrategy,
    pub params: BTreeMap<String, (f64, f64)>,
}

impl FittedScaler {
    fn scale_value(&self, x: f64, (a, b): (f64, f64)) -> f64 {
        match self.strategy {
            ScalingStrategy::MinMax if b > a => (x - a) / (b - a),
            ScalingStrategy::Standard if b > 0.0 => (x - a) / b,
            _ => 0.0,
        }
    }

    /// Rescale the fitted columns of `df`. Nulls stay null.
    pub fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let columns: Vec<&String> = self.params.keys().collect();
        ensure_numeric_columns(&df, &columns, "apply scaler")?;

        let mut df = df;
        for (column, &params) in &self.params {
            let scaled: Vec<Option<f64>> = column_to_f64_vec(df.column(column)?)?
                .into_iter()
                .map(|v| v.map(|x| self.scale_value(x, params)))
                .collect();
            df = replace_column(df, Series::new(column.as_str().into(), scaled))?;
        }
        Ok(df)
    }
}

/// Fits a scaler on the columns it is given and keeps the result.
#[derive(Debug, Clone, Default)]
pub struct FeatureScaler {
    strategy: ScalingStrategy,
    fitted: Option<FittedScaler>,
}

impl FeatureScaler {
    pub fn new(strategy: ScalingStrategy) -> Self {
        Self {
            strategy,
            fitted: None,
        }
    }

    pub fn fit_scale<S: AsRef<str>>(&mut self, df: DataFrame, columns: &[S]) -> Result<DataFrame> {
        ensure_numeric_columns(&df, columns, "fit scaler")?;

        let mut params = BTreeMap::new();
        for name in columns {
            let name = name.as_ref();
            let values: Vec<f64> = column_to_f64_vec(df.column(name)?)?
                .into_iter()
                .flatten()
                .collect();
            if values.is_empty() {
                warn!(column = name, "no values to fit scaler on; column will scale to 0");
            }
            let pair = match self.strategy {
                ScalingStrategy::MinMax => min_max(&values),
                ScalingStrategy::Standard => mean_std(&values),
            };
            if pair.0 == pair.1 && self.strategy == ScalingStrategy::MinMax {
                warn!(column = name, "constant column; scaled values set to 0");
            }
            params.insert(name.to_string(), pair);
        }

        let fitted = FittedScaler {
            strategy: self.strategy,
            params,
        };
        let df = fitted.transform(df)?;
        info!(strategy = ?self.strategy, columns = columns.len(), "scaler fitted");
        self.fitted = Some(fitted);
        Ok(df)
    }

    /// State learned by the last [`FeatureScaler::fit_scale`] call.
    pub fn fitted(&self) -> Result<&FittedScaler> {
        self.fitted.as_ref().ok_or(PipelineError::NotFitted {
            component: "feature scaler",
            hint: "call fit_scale before requesting the fitted scaler",
        })
    }

    pub fn into_fitted(self) -> Result<FittedScaler> {
        self.fitted.ok_or(PipelineError::NotFitted {
            component: "feature scaler",
            hint: "call fit_scale before requesting the fitted scaler",
        })
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitted_before_fit_is_error() {
        let scaler = FeatureScaler::new(ScalingStrategy::MinMax);
        assert!(matches!(
            scaler.fitted(),
            Err(PipelineError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_mean_std_population() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
    }
}
