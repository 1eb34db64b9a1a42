//! Binary classification metrics

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::classifier::ChurnClassifier;
use super::features::labels;
use crate::error::{PipelineError, Result};

/// Metrics on the positive class (1).
///
/// `confusion_matrix` is `[[tn, fp], [fn, tp]]`. Ratios with a zero
/// denominator are reported as 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub confusion_matrix: [[usize; 2]; 2],
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn accuracy(actual: &[usize], predicted: &[usize]) -> f64 {
    let correct = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
    ratio(correct, actual.len())
}

impl EvaluationReport {
    pub fn from_predictions(actual: &[usize], predicted: &[usize]) -> Self {
        let mut cm = [[0usize; 2]; 2];
        for (&a, &p) in actual.iter().zip(predicted) {
            cm[a.min(1)][p.min(1)] += 1;
        }
        let [[tn, fp], [fn_, tp]] = cm;

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Self {
            confusion_matrix: cm,
            accuracy: ratio(tn + tp, tn + fp + fn_ + tp),
            precision,
            recall,
            f1,
        }
    }

    pub fn true_negatives(&self) -> usize {
        self.confusion_matrix[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.confusion_matrix[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.confusion_matrix[1][0]
    }

    pub fn true_positives(&self) -> usize {
        self.confusion_matrix[1][1]
    }
}

/// Score a fitted classifier on held-out rows.
pub fn evaluate(classifier: &ChurnClassifier, x: &DataFrame, y: &DataFrame) -> Result<EvaluationReport> {
    let actual = labels(y)?.to_vec();
    let predicted = classifier.predict(x)?.to_vec();
    if actual.len() != predicted.len() {
        return Err(PipelineError::Model(format!(
            "evaluation features have {} rows, target has {}",
            predicted.len(),
            actual.len()
        )));
    }

    let report = EvaluationReport::from_predictions(&actual, &predicted);
    info!(
        accuracy = report.accuracy,
        precision = report.precision,
        recall = report.recall,
        f1 = report.f1,
        "model evaluated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_from_known_predictions() {
        let actual = [0, 0, 1, 1, 1, 0];
        let predicted = [0, 1, 1, 0, 1, 0];
        let report = EvaluationReport::from_predictions(&actual, &predicted);

        assert_eq!(report.confusion_matrix, [[2, 1], [1, 2]]);
        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert!((report.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_positive_predictions_gives_zero_precision() {
        let report = EvaluationReport::from_predictions(&[1, 0, 1], &[0, 0, 0]);
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.recall, 0.0);
        assert_eq!(report.f1, 0.0);
        assert_eq!(report.false_negatives(), 2);
    }
}
