//! Seeded train/test partitioning

use std::collections::BTreeMap;
use std::path::Path;

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::columns::{column_to_string_vec, ensure_columns, filter_rows};
use super::loader::{load_dataset, save_dataset, LoadOptions};
use crate::error::{PipelineError, Result};

const SPLIT_FILES: [&str; 4] = ["X_train.csv", "X_test.csv", "y_train.csv", "y_test.csv"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Uniform random rows
    #[default]
    Simple,
    /// Same test fraction inside every target class
    Stratified,
}

/// Features and target for both partitions. `y_*` hold the single target column.
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: DataFrame,
    pub y_test: DataFrame,
}

impl DataSplit {
    /// True when all four partition files are present in `dir`.
    pub fn exists(dir: &Path) -> bool {
        SPLIT_FILES.iter().all(|f| dir.join(f).exists())
    }

    pub fn save(&mut self, dir: &Path) -> Result<()> {
        let [x_train, x_test, y_train, y_test] = SPLIT_FILES;
        save_dataset(&mut self.x_train, &dir.join(x_train))?;
        save_dataset(&mut self.x_test, &dir.join(x_test))?;
        save_dataset(&mut self.y_train, &dir.join(y_train))?;
        save_dataset(&mut self.y_test, &dir.join(y_test))?;
        info!(dir = %dir.display(), "saved train/test split");
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let options = LoadOptions::default();
        let read = |file: &str| -> Result<DataFrame> {
            let path = dir.join(file);
            if !path.exists() {
                return Err(PipelineError::ArtifactNotFound { path });
            }
            load_dataset(&path, &options)
        };
        let [x_train, x_test, y_train, y_test] = SPLIT_FILES;
        Ok(Self {
            x_train: read(x_train)?,
            x_test: read(x_test)?,
            y_train: read(y_train)?,
            y_test: read(y_test)?,
        })
    }
}

/// Split `df` into features and target, then into train and test rows.
///
/// The test partition holds `ceil(n * test_fraction)` rows for the simple
/// strategy. Row order inside each partition follows `df`.
pub fn split(
    df: &DataFrame,
    target: &str,
    test_fraction: f64,
    seed: u64,
    strategy: SplitStrategy,
) -> Result<DataSplit> {
    ensure_columns(df, &[target], "split")?;
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::config(format!(
            "test fraction must be between 0 and 1 (exclusive), got {}",
            test_fraction
        )));
    }

    let n = df.height();
    let mut rng = StdRng::seed_from_u64(seed);
    let test_rows: Vec<usize> = match strategy {
        SplitStrategy::Simple => {
            let mut indices: Vec<usize> = (0..n).collect();
            indices.shuffle(&mut rng);
            let test_n = (n as f64 * test_fraction).ceil() as usize;
            indices.truncate(test_n);
            indices
        }
        SplitStrategy::Stratified => {
            let mut classes: BTreeMap<Option<String>, Vec<usize>> = BTreeMap::new();
            for (idx, label) in column_to_string_vec(df.column(target)?)?.into_iter().enumerate() {
                classes.entry(label).or_default().push(idx);
            }
            let mut picked = Vec::new();
            for (_, mut rows) in classes {
                rows.shuffle(&mut rng);
                let count = rows.len();
                let mut take = (count as f64 * test_fraction).round() as usize;
                if count >= 2 {
                    take = take.clamp(1, count - 1);
                }
                picked.extend(rows.into_iter().take(take));
            }
            picked
        }
    };

    let mut is_test = vec![false; n];
    for idx in test_rows {
        is_test[idx] = true;
    }
    let is_train: Vec<bool> = is_test.iter().map(|t| !t).collect();

    let test_n = is_test.iter().filter(|t| **t).count();
    if test_n == 0 || test_n == n {
        return Err(PipelineError::config(format!(
            "cannot split {} rows with test fraction {}: one partition would be empty",
            n, test_fraction
        )));
    }

    let features = df.drop(target)?;
    let labels = df.select([target])?;

    let split = DataSplit {
        x_train: filter_rows(&features, &is_train)?,
        x_test: filter_rows(&features, &is_test)?,
        y_train: filter_rows(&labels, &is_train)?,
        y_test: filter_rows(&labels, &is_test)?,
    };

    info!(
        strategy = ?strategy,
        train_rows = split.x_train.height(),
        test_rows = split.x_test.height(),
        seed,
        "split data"
    );
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_round_up() {
        let df = df! {
            "x" => (0..10).collect::<Vec<i64>>(),
            "y" => [0i64, 1, 0, 1, 0, 1, 0, 1, 0, 1],
        }
        .unwrap();

        let split = split(&df, "y", 0.25, 42, SplitStrategy::Simple).unwrap();
        assert_eq!(split.x_test.height(), 3);
        assert_eq!(split.x_train.height(), 7);
        assert_eq!(split.y_test.width(), 1);
        assert!(split.x_train.column("y").is_err());
    }

    #[test]
    fn test_single_row_cannot_split() {
        let df = df! { "x" => [1i64], "y" => [0i64] }.unwrap();
        assert!(split(&df, "y", 0.2, 42, SplitStrategy::Simple).is_err());
    }
}
