//! Tests for missing value handling and predictor-backed imputation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use churnflow::pipeline::{
    analyze_missing_values, drop_missing_critical, fill_with_mean, CustomImputer,
    FrequencyPredictor, MissingValueStrategy, ValuePredictor,
};
use churnflow::PipelineError;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

/// Answers from a fixed table and fails for "Error" names; counts calls.
struct ScriptedPredictor {
    calls: Arc<AtomicUsize>,
}

impl ValuePredictor for ScriptedPredictor {
    fn name(&self) -> &str {
        "scripted"
    }

    fn predict(&self, auxiliary: &[&str]) -> anyhow::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match auxiliary[0] {
            "Error" => anyhow::bail!("service unavailable"),
            "Blank" => Ok(Some("   ".to_string())),
            "Unknown" => Ok(None),
            name if name.ends_with('a') => Ok(Some("Female".to_string())),
            _ => Ok(Some("Male".to_string())),
        }
    }
}

fn scripted() -> (Box<dyn ValuePredictor>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (
        Box::new(ScriptedPredictor {
            calls: Arc::clone(&calls),
        }),
        calls,
    )
}

#[test]
fn test_drop_critical_removes_only_rows_missing_critical_values() {
    let df = df! {
        "Geography" => [Some("France"), None, Some("Spain"), Some("Germany"), Some("France")],
        "Tenure" => [Some(1i64), Some(2), None, Some(4), Some(5)],
        "Notes" => [None::<&str>, Some("x"), Some("y"), None, None],
    }
    .unwrap();

    let cleaned = drop_missing_critical(df, &["Geography".to_string(), "Tenure".to_string()]).unwrap();

    common::assert_shape(&cleaned, 3, 3);
    assert_eq!(cleaned.column("Geography").unwrap().null_count(), 0);
    assert_eq!(cleaned.column("Tenure").unwrap().null_count(), 0);
    // Non-critical missingness untouched
    assert_eq!(cleaned.column("Notes").unwrap().null_count(), 3);
}

#[test]
fn test_drop_critical_unknown_column_is_configuration_error() {
    let df = df! { "a" => [Some(1i64), None] }.unwrap();
    let err = drop_missing_critical(df, &["missing".to_string()]).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}

#[test]
fn test_fill_mean_uses_present_values() {
    let df = df! { "Age" => [Some(20i64), None, Some(40), None] }.unwrap();
    let filled = fill_with_mean(df, "Age").unwrap();

    let ages: Vec<Option<f64>> = filled.column("Age").unwrap().f64().unwrap().into_iter().collect();
    assert_eq!(ages, vec![Some(20.0), Some(30.0), Some(40.0), Some(30.0)]);
}

#[test]
fn test_fill_mean_all_missing_is_left_unchanged() {
    let df = df! { "Age" => [None::<f64>, None] }.unwrap();
    let filled = fill_with_mean(df, "Age").unwrap();
    assert_eq!(filled.column("Age").unwrap().null_count(), 2);
}

#[test]
fn test_fill_mean_rejects_text_column() {
    let df = df! { "Gender" => [Some("Male"), None] }.unwrap();
    assert!(matches!(
        fill_with_mean(df, "Gender"),
        Err(PipelineError::Configuration(_))
    ));
}

#[test]
fn test_imputer_failures_stay_missing_per_row() {
    let df = df! {
        "Firstname" => ["Anna", "Error", "Bob", "Blank", "Unknown", "Maria"],
        "Lastname" => ["A", "B", "C", "D", "E", "F"],
        "Gender" => [None, None, Some("Male"), None, None, None],
    }
    .unwrap();

    let (predictor, calls) = scripted();
    let imputer = CustomImputer::new(
        "Gender",
        vec!["Firstname".to_string(), "Lastname".to_string()],
        predictor,
    );
    let (imputed, report) = imputer.impute(df).unwrap();

    // Only rows with a missing target are sent to the predictor
    assert_eq!(calls.load(Ordering::SeqCst), 5);

    let gender: Vec<Option<&str>> = imputed.column("Gender").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(
        gender,
        vec![Some("Female"), None, Some("Male"), None, None, Some("Female")]
    );

    let mut imputed_rows: Vec<usize> = report.imputed.iter().map(|(row, _)| *row).collect();
    imputed_rows.sort();
    assert_eq!(imputed_rows, vec![0, 5]);
    let mut unresolved = report.unresolved.clone();
    unresolved.sort();
    assert_eq!(unresolved, vec![1, 3, 4]);
}

#[test]
fn test_imputer_validates_columns_before_predicting() {
    let df = df! {
        "Firstname" => ["Anna"],
        "Gender" => [None::<&str>],
    }
    .unwrap();

    let (predictor, calls) = scripted();
    let imputer = CustomImputer::new("Gender", vec!["Surname".to_string()], predictor);

    assert!(matches!(imputer.impute(df), Err(PipelineError::Configuration(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_strategy_with_frequency_predictor() {
    let df = common::create_churn_dataframe(120);
    let missing_before = df.column("Gender").unwrap().null_count();
    assert!(missing_before > 0);

    let predictor = FrequencyPredictor::fit(&df, "Firstname", "Gender").unwrap();
    let strategy = MissingValueStrategy::Impute(CustomImputer::new(
        "Gender",
        vec!["Firstname".to_string()],
        Box::new(predictor),
    ));
    let handled = strategy.handle(df).unwrap();

    assert_eq!(handled.column("Gender").unwrap().null_count(), 0);
    assert_eq!(handled.height(), 120);
}

#[test]
fn test_missing_ratios_for_fixture() {
    let df = common::create_churn_dataframe(143);
    let ratios = analyze_missing_values(&df);

    // Gender is missing every 11th row: the highest ratio in the fixture
    assert_eq!(ratios[0].0, "Gender");
    assert!((ratios[0].1 - 13.0 / 143.0).abs() < 1e-9);
}
