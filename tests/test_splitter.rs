//! Tests for seeded train/test splitting and split caching

use churnflow::pipeline::{split, DataSplit, SplitStrategy};
use polars::prelude::*;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

fn ids(df: &DataFrame) -> Vec<i64> {
    df.column("id").unwrap().i64().unwrap().into_iter().flatten().collect()
}

fn frame(rows: i64) -> DataFrame {
    df! {
        "id" => (0..rows).collect::<Vec<i64>>(),
        "x" => (0..rows).map(|i| i as f64 * 0.5).collect::<Vec<f64>>(),
        "Exited" => (0..rows).map(|i| i64::from(i % 4 == 0)).collect::<Vec<i64>>(),
    }
    .unwrap()
}

#[test]
fn test_partitions_are_disjoint_and_complete() {
    let df = frame(50);
    let s = split(&df, "Exited", 0.2, 42, SplitStrategy::Simple).unwrap();

    assert_eq!(s.x_test.height(), 10);
    assert_eq!(s.x_train.height(), 40);
    common::assert_missing_columns(&s.x_train, &["Exited"]);
    common::assert_shape(&s.y_train, 40, 1);

    let mut all: Vec<i64> = ids(&s.x_train);
    all.extend(ids(&s.x_test));
    all.sort();
    assert_eq!(all, (0..50).collect::<Vec<i64>>());
}

#[test]
fn test_same_seed_same_split() {
    let df = frame(40);
    let a = split(&df, "Exited", 0.25, 7, SplitStrategy::Simple).unwrap();
    let b = split(&df, "Exited", 0.25, 7, SplitStrategy::Simple).unwrap();
    let c = split(&df, "Exited", 0.25, 8, SplitStrategy::Simple).unwrap();

    assert_eq!(ids(&a.x_test), ids(&b.x_test));
    assert_ne!(ids(&a.x_test), ids(&c.x_test));
}

#[test]
fn test_partitions_keep_source_order_and_targets_aligned() {
    let df = frame(30);
    let s = split(&df, "Exited", 0.3, 1, SplitStrategy::Simple).unwrap();

    let train_ids = ids(&s.x_train);
    assert!(train_ids.windows(2).all(|w| w[0] < w[1]));

    let y: Vec<i64> = s.y_train.column("Exited").unwrap().i64().unwrap().into_iter().flatten().collect();
    for (id, label) in train_ids.iter().zip(y) {
        assert_eq!(label, i64::from(id % 4 == 0));
    }
}

#[test]
fn test_stratified_keeps_class_share() {
    let df = frame(80);
    let s = split(&df, "Exited", 0.25, 42, SplitStrategy::Stratified).unwrap();

    let positives = s
        .y_test
        .column("Exited")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .filter(|v| *v == 1)
        .count();
    // 20 positives, 60 negatives
    assert_eq!(positives, 5);
    assert_eq!(s.x_test.height(), 20);
}

#[test]
fn test_unknown_target_rejected() {
    let df = frame(10);
    assert!(split(&df, "Churn", 0.2, 42, SplitStrategy::Simple).is_err());
}

#[test]
fn test_save_and_load_split() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("data");
    let df = frame(20);
    let mut s = split(&df, "Exited", 0.2, 42, SplitStrategy::Simple).unwrap();

    assert!(!DataSplit::exists(&dir));
    s.save(&dir).unwrap();
    assert!(DataSplit::exists(&dir));
    for file in ["X_train.csv", "X_test.csv", "y_train.csv", "y_test.csv"] {
        assert!(dir.join(file).exists(), "{} should exist", file);
    }

    let loaded = DataSplit::load(&dir).unwrap();
    assert_eq!(ids(&loaded.x_train), ids(&s.x_train));
    common::assert_shape(&loaded.y_test, 4, 1);
}
