//! Tests for feature scaling and fitted-state replay

use churnflow::pipeline::{FeatureScaler, ScalingStrategy};
use churnflow::PipelineError;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

fn values(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
    df.column(column).unwrap().f64().unwrap().into_iter().collect()
}

#[test]
fn test_min_max_maps_extremes_to_unit_interval() {
    let df = df! {
        "Balance" => [0.0f64, 50.0, 100.0, 25.0],
        "EstimatedSalary" => [10i64, 20, 30, 40],
        "Age" => [30i64, 40, 50, 60],
    }
    .unwrap();

    let mut scaler = FeatureScaler::new(ScalingStrategy::MinMax);
    let scaled = scaler.fit_scale(df, &["Balance", "EstimatedSalary"]).unwrap();

    assert_eq!(values(&scaled, "Balance"), vec![Some(0.0), Some(0.5), Some(1.0), Some(0.25)]);
    let salary = values(&scaled, "EstimatedSalary");
    assert_eq!(salary[0], Some(0.0));
    assert_eq!(salary[3], Some(1.0));
    // Unselected columns untouched
    assert_eq!(scaled.column("Age").unwrap().dtype(), &DataType::Int64);

    let fitted = scaler.fitted().unwrap();
    assert_eq!(fitted.params["Balance"], (0.0, 100.0));
    assert_eq!(fitted.params["EstimatedSalary"], (10.0, 40.0));
}

#[test]
fn test_scaled_fixture_values_within_bounds() {
    let df = common::create_churn_dataframe(150);
    let mut scaler = FeatureScaler::default();
    let scaled = scaler.fit_scale(df, &["Balance", "EstimatedSalary"]).unwrap();

    for column in ["Balance", "EstimatedSalary"] {
        assert!(values(&scaled, column)
            .into_iter()
            .flatten()
            .all(|v| (0.0..=1.0).contains(&v)));
    }
}

#[test]
fn test_constant_column_scales_to_zero() {
    let df = df! { "x" => [5.0f64, 5.0, 5.0] }.unwrap();
    let mut scaler = FeatureScaler::new(ScalingStrategy::MinMax);
    let scaled = scaler.fit_scale(df, &["x"]).unwrap();
    assert_eq!(values(&scaled, "x"), vec![Some(0.0); 3]);
}

#[test]
fn test_nulls_stay_null() {
    let df = df! { "x" => [Some(1.0f64), None, Some(3.0)] }.unwrap();
    let mut scaler = FeatureScaler::new(ScalingStrategy::MinMax);
    let scaled = scaler.fit_scale(df, &["x"]).unwrap();
    assert_eq!(values(&scaled, "x"), vec![Some(0.0), None, Some(1.0)]);
}

#[test]
fn test_replay_uses_training_bounds() {
    let mut scaler = FeatureScaler::new(ScalingStrategy::MinMax);
    scaler
        .fit_scale(df! { "x" => [0.0f64, 10.0] }.unwrap(), &["x"])
        .unwrap();

    let replayed = scaler
        .fitted()
        .unwrap()
        .transform(df! { "x" => [5.0f64, 20.0] }.unwrap())
        .unwrap();
    assert_eq!(values(&replayed, "x"), vec![Some(0.5), Some(2.0)]);
}

#[test]
fn test_standard_scaling() {
    let df = df! { "x" => [2.0f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] }.unwrap();
    let mut scaler = FeatureScaler::new(ScalingStrategy::Standard);
    let scaled = scaler.fit_scale(df, &["x"]).unwrap();

    let x = values(&scaled, "x");
    assert_eq!(x[0], Some(-1.5));
    assert_eq!(x[7], Some(2.0));
}

#[test]
fn test_fitted_state_requires_fit() {
    let scaler = FeatureScaler::new(ScalingStrategy::MinMax);
    assert!(matches!(scaler.fitted(), Err(PipelineError::NotFitted { .. })));
    assert!(matches!(scaler.into_fitted(), Err(PipelineError::NotFitted { .. })));
}

#[test]
fn test_scaling_text_column_rejected() {
    let df = df! { "name" => ["a"] }.unwrap();
    let mut scaler = FeatureScaler::default();
    assert!(matches!(
        scaler.fit_scale(df, &["name"]),
        Err(PipelineError::Configuration(_))
    ));
    assert!(scaler.fitted().is_err());
}
