//! Rule-based binning of a numeric column into labelled buckets

use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::columns::{column_to_f64_vec, ensure_numeric_columns, replace_column};
use crate::error::Result;

/// Highest possible credit score; always binned as [`CEILING_LABEL`].
pub const CREDIT_SCORE_CEILING: f64 = 850.0;
pub const CEILING_LABEL: &str = "Excellent";
/// Label for values no rule matches.
pub const INVALID_LABEL: &str = "Invalid";

/// Range of one rule. Written in configuration as `[lo, hi]` or `[lo]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub enum BinRange {
    /// `lo <= x <= hi`
    Closed { lo: f64, hi: f64 },
    /// `x >= lo`
    AtLeast { lo: f64 },
}

impl BinRange {
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            BinRange::Closed { lo, hi } => value >= lo && value <= hi,
            BinRange::AtLeast { lo } => value >= lo,
        }
    }
}

impl TryFrom<Vec<f64>> for BinRange {
    type Error = String;

    fn try_from(bounds: Vec<f64>) -> std::result::Result<Self, Self::Error> {
        match bounds.as_slice() {
            [lo] => Ok(BinRange::AtLeast { lo: *lo }),
            [lo, hi] if lo <= hi => Ok(BinRange::Closed { lo: *lo, hi: *hi }),
            [lo, hi] => Err(format!("bin range [{}, {}] has lower bound above upper bound", lo, hi)),
            other => Err(format!(
                "bin range must have one or two bounds, got {}",
                other.len()
            )),
        }
    }
}

impl From<BinRange> for Vec<f64> {
    fn from(range: BinRange) -> Self {
        match range {
            BinRange::Closed { lo, hi } => vec![lo, hi],
            BinRange::AtLeast { lo } => vec![lo],
        }
    }
}

impl fmt::Display for BinRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinRange::Closed { lo, hi } => write!(f, "[{}, {}]", lo, hi),
            BinRange::AtLeast { lo } => write!(f, "[{}, inf)", lo),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinRule {
    pub range: BinRange,
    pub label: String,
}

/// Ordered rules; the first rule containing a value wins.
#[derive(Debug, Clone)]
pub struct CustomBinning {
    rules: Vec<BinRule>,
}

impl CustomBinning {
    pub fn new(rules: Vec<BinRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[BinRule] {
        &self.rules
    }

    /// Label for a single value.
    pub fn label_for(&self, value: f64) -> &str {
        if value == CREDIT_SCORE_CEILING {
            return CEILING_LABEL;
        }
        self.rules
            .iter()
            .find(|rule| rule.range.contains(value))
            .map(|rule| rule.label.as_str())
            .unwrap_or(INVALID_LABEL)
    }

    /// Add `<column>_binned`. Null inputs give null labels.
    pub fn bin(&self, df: DataFrame, column: &str) -> Result<DataFrame> {
        ensure_numeric_columns(&df, &[column], "bin column")?;

        let values = column_to_f64_vec(df.column(column)?)?;
        let labels: Vec<Option<&str>> = values
            .iter()
            .map(|v| v.map(|x| self.label_for(x)))
            .collect();

        let invalid = labels.iter().filter(|l| **l == Some(INVALID_LABEL)).count();
        let output = format!("{}_binned", column);
        info!(column, output = %output, invalid, "binned column");

        replace_column(df, Series::new(output.as_str().into(), labels))
    }
}
