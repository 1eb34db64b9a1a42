//! Model training

use polars::prelude::DataFrame;
use tracing::info;

use super::classifier::ChurnClassifier;
use super::evaluation::accuracy;
use super::features::labels;
use crate::config::ModelConfig;
use crate::error::Result;

pub struct ModelTrainer {
    config: ModelConfig,
}

impl ModelTrainer {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Fit a classifier and return it with its accuracy on the training rows.
    ///
    /// The training score is not a held-out estimate.
    pub fn train(&self, x_train: &DataFrame, y_train: &DataFrame) -> Result<(ChurnClassifier, f64)> {
        let classifier = ChurnClassifier::fit(x_train, y_train, &self.config)?;

        let actual = labels(y_train)?;
        let predicted = classifier.predict(x_train)?;
        let training_score = accuracy(&actual.to_vec(), &predicted.to_vec());

        info!(
            rows = x_train.height(),
            features = classifier.feature_columns().len(),
            training_score,
            "model trained"
        );
        Ok((classifier, training_score))
    }
}
