//! Shared test utilities and fixture generators

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FIRST_NAMES: [(&str, &str); 8] = [
    ("James", "Male"),
    ("Maria", "Female"),
    ("Lucas", "Male"),
    ("Sophie", "Female"),
    ("Hans", "Male"),
    ("Elena", "Female"),
    ("Pierre", "Male"),
    ("Anna", "Female"),
];
const LAST_NAMES: [&str; 5] = ["Smith", "Garcia", "Müller", "Dubois", "Rossi"];
const GEOGRAPHIES: [&str; 3] = ["France", "Spain", "Germany"];

/// Create a synthetic customer table with the churn dataset's schema
///
/// Deterministic for a given `rows`:
/// - `Geography` is missing every 37th row (critical column, dropped)
/// - `Gender` is missing every 11th row (imputable from `Firstname`)
/// - `Age` is missing every 13th row (mean filled)
/// - `Exited` depends on age and activity so both classes are present
pub fn create_churn_dataframe(rows: usize) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(7);

    let mut row_number = Vec::with_capacity(rows);
    let mut customer_id = Vec::with_capacity(rows);
    let mut first = Vec::with_capacity(rows);
    let mut last = Vec::with_capacity(rows);
    let mut credit = Vec::with_capacity(rows);
    let mut geography = Vec::with_capacity(rows);
    let mut gender = Vec::with_capacity(rows);
    let mut age = Vec::with_capacity(rows);
    let mut tenure = Vec::with_capacity(rows);
    let mut balance = Vec::with_capacity(rows);
    let mut products = Vec::with_capacity(rows);
    let mut has_card = Vec::with_capacity(rows);
    let mut active = Vec::with_capacity(rows);
    let mut salary = Vec::with_capacity(rows);
    let mut exited = Vec::with_capacity(rows);

    for i in 0..rows {
        let (name, sex) = FIRST_NAMES[i % FIRST_NAMES.len()];
        let customer_age: i64 = rng.gen_range(18..=70);
        let is_active: i64 = rng.gen_range(0..=1);
        let customer_balance: f64 = if rng.gen_bool(0.3) {
            0.0
        } else {
            rng.gen_range(20_000.0..200_000.0)
        };

        row_number.push(i as i64 + 1);
        customer_id.push(15_600_000 + i as i64);
        first.push(name);
        last.push(LAST_NAMES[i % LAST_NAMES.len()]);
        credit.push(if i % 50 == 0 { 850 } else { rng.gen_range(350..=849i64) });
        geography.push(if i % 37 == 5 {
            None
        } else {
            Some(GEOGRAPHIES[rng.gen_range(0..GEOGRAPHIES.len())])
        });
        gender.push(if i % 11 == 3 { None } else { Some(sex) });
        age.push(if i % 13 == 4 { None } else { Some(customer_age) });
        tenure.push(rng.gen_range(0..=10i64));
        balance.push(customer_balance);
        products.push(rng.gen_range(1..=4i64));
        has_card.push(rng.gen_range(0..=1i64));
        active.push(is_active);
        salary.push(rng.gen_range(10_000.0..150_000.0f64));
        exited.push(i64::from(customer_age > 50 || (is_active == 0 && customer_balance > 100_000.0)));
    }

    df! {
        "RowNumber" => row_number,
        "CustomerId" => customer_id,
        "Firstname" => first,
        "Lastname" => last,
        "CreditScore" => credit,
        "Geography" => geography,
        "Gender" => gender,
        "Age" => age,
        "Tenure" => tenure,
        "Balance" => balance,
        "NumOfProducts" => products,
        "HasCrCard" => has_card,
        "IsActiveMember" => active,
        "EstimatedSalary" => salary,
        "Exited" => exited,
    }
    .unwrap()
}

/// Pipeline configuration pointing at `data_path`, with artifacts under `artifacts_dir`
pub fn churn_config_yaml(data_path: &Path, artifacts_dir: &Path) -> String {
    format!(
        r#"
data:
  path: "{data}"
  artifacts_dir: "{artifacts}"
columns:
  critical: [Geography, Tenure, IsActiveMember]
  outlier: [Balance, Age, EstimatedSalary]
  drop: [RowNumber, CustomerId, Firstname, Lastname, CreditScore]
missing_values:
  fill_mean: [Age]
  imputer:
    target: Gender
    auxiliary: [Firstname, Lastname]
    backend: frequency
binning:
  column: CreditScore
  bins:
    - {{ range: [300, 579], label: Poor }}
    - {{ range: [580, 669], label: Fair }}
    - {{ range: [670, 739], label: Good }}
    - {{ range: [740, 799], label: Very Good }}
    - {{ range: [800], label: Excellent }}
encoding:
  nominal: [Geography, Gender]
  ordinal:
    CreditScore_binned: {{ Poor: 0, Fair: 1, Good: 2, Very Good: 3, Excellent: 4 }}
scaling:
  strategy: min_max
  columns: [Balance, EstimatedSalary]
split:
  target: Exited
  test_fraction: 0.2
  seed: 42
model:
  logistic_regression:
    max_iterations: 300
"#,
        data = data_path.display(),
        artifacts = artifacts_dir.display()
    )
}

/// Temp workspace with a churn CSV and a config file; returns (dir, config path)
pub fn create_churn_workspace(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let data_path = temp_dir.path().join("churn.csv");
    let mut df = create_churn_dataframe(rows);
    let mut file = std::fs::File::create(&data_path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();

    let config_path = temp_dir.path().join("config.yaml");
    let artifacts = temp_dir.path().join("artifacts");
    std::fs::write(&config_path, churn_config_yaml(&data_path, &artifacts)).unwrap();

    (temp_dir, config_path)
}

/// A record shaped like one raw customer row
pub fn sample_record_json() -> &'static str {
    r#"{
        "RowNumber": 1,
        "CustomerId": 15634602,
        "Firstname": "Maria",
        "Lastname": "Garcia",
        "CreditScore": 619,
        "Geography": "France",
        "Gender": "Female",
        "Age": 42,
        "Tenure": 2,
        "Balance": 0.0,
        "NumOfProducts": 1,
        "HasCrCard": 1,
        "IsActiveMember": 1,
        "EstimatedSalary": 101348.88
    }"#
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
