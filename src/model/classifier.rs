//! Churn classifiers: logistic regression or a bagged decision-tree forest

use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::{labels, FeatureLayout};
use crate::config::{LogisticRegressionConfig, ModelConfig, ModelKind, RandomForestConfig};
use crate::error::{PipelineError, Result};

/// Decision trees fitted on bootstrap samples of the training rows.
///
/// The churn probability of a row is the share of trees voting 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree<f64, usize>>,
}

impl RandomForest {
    fn fit(records: &Array2<f64>, targets: &Array1<usize>, config: &RandomForestConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let rows = records.nrows();
        let params = DecisionTree::<f64, usize>::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(config.max_depth)
            .min_weight_split(config.min_samples_split as f32)
            .min_weight_leaf(config.min_samples_leaf as f32);

        let mut trees = Vec::with_capacity(config.n_estimators);
        for i in 0..config.n_estimators {
            let sample: Vec<usize> = (0..rows).map(|_| rng.gen_range(0..rows)).collect();
            let dataset = Dataset::new(
                records.select(Axis(0), &sample),
                targets.select(Axis(0), &sample),
            );
            let tree = params
                .fit(&dataset)
                .map_err(|e| PipelineError::Model(format!("tree {}: {}", i, e)))?;
            trees.push(tree);
        }
        debug!(trees = trees.len(), "random forest fitted");
        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut votes = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            let predicted: Array1<usize> = tree.predict(x);
            votes.zip_mut_with(&predicted, |v, &p| *v += p as f64);
        }
        votes / self.trees.len().max(1) as f64
    }
}

/// The fitted learner behind a [`ChurnClassifier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FittedModel {
    LogisticRegression(FittedLogisticRegression<f64, usize>),
    RandomForest(RandomForest),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::LogisticRegression(_) => ModelKind::LogisticRegression,
            FittedModel::RandomForest(_) => ModelKind::RandomForest,
        }
    }
}

fn fit_logistic(
    records: Array2<f64>,
    targets: Array1<usize>,
    config: &LogisticRegressionConfig,
) -> Result<FittedLogisticRegression<f64, usize>> {
    let dataset = Dataset::new(records, targets);
    LogisticRegression::default()
        .alpha(config.alpha)
        .max_iterations(config.max_iterations)
        .gradient_tolerance(config.gradient_tolerance)
        .fit(&dataset)
        .map_err(|e| PipelineError::Model(e.to_string()))
}

/// Fitted binary classifier plus the feature layout it was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnClassifier {
    model: FittedModel,
    layout: FeatureLayout,
    decision_threshold: f64,
}

impl ChurnClassifier {
    /// Fit the configured model kind on a feature table and a one-column
    /// 0/1 target table.
    ///
    /// Both classes must be present.
    pub fn fit(x: &DataFrame, y: &DataFrame, config: &ModelConfig) -> Result<Self> {
        let layout = FeatureLayout::fit(x)?;
        let records = layout.matrix(x)?;
        let targets = labels(y)?;

        if records.nrows() != targets.len() {
            return Err(PipelineError::Model(format!(
                "feature table has {} rows, target has {}",
                records.nrows(),
                targets.len()
            )));
        }
        if !(targets.iter().any(|&t| t == 0) && targets.iter().any(|&t| t == 1)) {
            return Err(PipelineError::Model(
                "training target must contain both classes 0 and 1".to_string(),
            ));
        }

        let model = match config.kind {
            ModelKind::LogisticRegression => FittedModel::LogisticRegression(fit_logistic(
                records,
                targets,
                &config.logistic_regression,
            )?),
            ModelKind::RandomForest => {
                FittedModel::RandomForest(RandomForest::fit(&records, &targets, &config.random_forest)?)
            }
        };

        Ok(Self {
            model,
            layout,
            decision_threshold: config.decision_threshold,
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.layout.columns
    }

    pub fn fill_values(&self) -> &[f64] {
        &self.layout.fill_values
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }

    /// Probability of class 1 for a prepared matrix.
    pub fn predict_proba_matrix(&self, x: &Array2<f64>) -> Array1<f64> {
        match &self.model {
            FittedModel::LogisticRegression(model) => model.predict_probabilities(x),
            FittedModel::RandomForest(forest) => forest.predict_proba(x),
        }
    }

    /// Probability of class 1 for each row of a feature table.
    pub fn predict_proba(&self, x: &DataFrame) -> Result<Array1<f64>> {
        let matrix = self.layout.matrix(x)?;
        Ok(self.predict_proba_matrix(&matrix))
    }

    /// Class labels: 1 when the probability reaches the decision threshold.
    pub fn predict(&self, x: &DataFrame) -> Result<Array1<usize>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| usize::from(p >= self.decision_threshold)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forest_votes_are_probabilities() {
        let records = Array2::from_shape_vec((6, 1), vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]).unwrap();
        let targets = Array1::from(vec![0usize, 0, 0, 1, 1, 1]);
        let config = RandomForestConfig {
            n_estimators: 5,
            ..RandomForestConfig::default()
        };

        let forest = RandomForest::fit(&records, &targets, &config).unwrap();
        assert_eq!(forest.n_trees(), 5);

        let proba = forest.predict_proba(&records);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        // Multiples of 1/5
        assert!(proba.iter().all(|p| ((p * 5.0).round() - p * 5.0).abs() < 1e-9));
    }
}
