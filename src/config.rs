//! Pipeline configuration
//!
//! The whole run is driven by one YAML document, loaded once at startup into
//! an immutable [`PipelineConfig`] and handed to each component by reference.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::pipeline::{BinRule, ScalingStrategy, SplitStrategy};

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub missing_values: MissingValuesConfig,
    pub binning: BinningConfig,
    #[serde(default)]
    pub encoding: EncodingConfig,
    #[serde(default)]
    pub scaling: ScalingConfig,
    pub split: SplitConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

/// Input source and artifact locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Raw customer table (CSV, TSV, Parquet, or spreadsheet)
    pub path: PathBuf,
    /// Root directory for encoders, splits, model and reports
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    /// Field separator for delimited files. Inferred from the extension when absent.
    #[serde(default)]
    pub separator: Option<char>,
    /// Number of rows polars scans to infer CSV column types (0 = full scan)
    #[serde(default = "default_infer_schema_length")]
    pub infer_schema_length: usize,
    /// Worksheet to read from spreadsheet sources. Defaults to the first sheet.
    #[serde(default)]
    pub sheet: Option<String>,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_infer_schema_length() -> usize {
    10_000
}

impl DataConfig {
    /// Directory holding one `<column>_encoder.json` per nominal column.
    pub fn encoders_dir(&self) -> PathBuf {
        self.artifacts_dir.join("encoders")
    }

    /// Directory holding the cached train/test split.
    pub fn splits_dir(&self) -> PathBuf {
        self.artifacts_dir.join("data")
    }

    /// Trained model artifact.
    pub fn model_path(&self) -> PathBuf {
        self.artifacts_dir.join("models").join("churn_model.json")
    }

    /// Evaluation report written after training.
    pub fn evaluation_path(&self) -> PathBuf {
        self.artifacts_dir.join("reports").join("evaluation.json")
    }
}

/// Column groups used by several stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnsConfig {
    /// Rows with a missing value in any of these columns are dropped
    #[serde(default)]
    pub critical: Vec<String>,
    /// Numeric columns that take part in the outlier vote
    #[serde(default)]
    pub outlier: Vec<String>,
    /// Columns removed before splitting (identifiers, raw pre-binned values)
    #[serde(default)]
    pub drop: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissingValuesConfig {
    /// Numeric columns whose nulls are replaced by the column mean
    #[serde(default)]
    pub fill_mean: Vec<String>,
    /// Optional predictor-backed imputation for one categorical column
    #[serde(default)]
    pub imputer: Option<ImputerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputerConfig {
    /// Column whose missing values are predicted
    pub target: String,
    /// Columns handed to the predictor for each affected row
    pub auxiliary: Vec<String>,
    #[serde(default)]
    pub backend: ImputerBackend,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputerBackend {
    /// Most frequent value per auxiliary key, learned from the same table
    #[default]
    Frequency,
    /// OpenAI-compatible chat-completions service
    Llm,
}

/// Settings for the chat-completions predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,
    /// Answers outside this set are rejected
    #[serde(default = "default_llm_labels")]
    pub labels: Vec<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key_env: default_llm_api_key_env(),
            labels: default_llm_labels(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_llm_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_labels() -> Vec<String> {
    vec!["Male".to_string(), "Female".to_string()]
}

fn default_llm_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinningConfig {
    /// Numeric column to bin; the output column is `<column>_binned`
    pub column: String,
    /// Rules evaluated in order, first match wins
    pub bins: Vec<BinRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Columns encoded with codes learned from the data
    #[serde(default)]
    pub nominal: Vec<String>,
    /// Static value-to-code maps per column
    #[serde(default)]
    pub ordinal: BTreeMap<String, BTreeMap<String, i64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScalingConfig {
    #[serde(default)]
    pub strategy: ScalingStrategy,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Binary label column
    pub target: String,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub strategy: SplitStrategy,
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

/// Which classifier family to train.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    LogisticRegression,
    /// Bagged decision trees voting on the churn probability
    RandomForest,
}

impl ModelKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic regression",
            ModelKind::RandomForest => "random forest",
        }
    }
}

/// Classifier selection plus one hyperparameter block per kind.
///
/// Only the block matching `kind` is used; the other keeps its defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub kind: ModelKind,
    #[serde(default)]
    pub logistic_regression: LogisticRegressionConfig,
    #[serde(default)]
    pub random_forest: RandomForestConfig,
    /// Probability of churn at or above which a record is labelled 1
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            logistic_regression: LogisticRegressionConfig::default(),
            random_forest: RandomForestConfig::default(),
            decision_threshold: default_decision_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionConfig {
    /// L2 regularization strength
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    #[serde(default = "default_gradient_tolerance")]
    pub gradient_tolerance: f64,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            max_iterations: default_max_iterations(),
            gradient_tolerance: default_gradient_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    /// `null` grows trees until leaves are pure
    #[serde(default = "default_max_depth")]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Seed for the bootstrap samples
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            seed: default_seed(),
        }
    }
}

fn default_alpha() -> f64 {
    1.0
}

fn default_max_iterations() -> u64 {
    200
}

fn default_gradient_tolerance() -> f64 {
    1e-4
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_depth() -> Option<usize> {
    Some(10)
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_decision_threshold() -> f64 {
    0.5
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!(
                "cannot read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&text)
    }

    /// Parse and validate a configuration document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(text)
            .map_err(|e| PipelineError::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that can be judged without looking at the data.
    pub fn validate(&self) -> Result<()> {
        let split = &self.split;
        if !(split.test_fraction > 0.0 && split.test_fraction < 1.0) {
            return Err(PipelineError::config(format!(
                "split.test_fraction must be between 0 and 1 (exclusive), got {}",
                split.test_fraction
            )));
        }

        if self.binning.bins.is_empty() {
            return Err(PipelineError::config("binning.bins must not be empty"));
        }
        if let Some(rule) = self.binning.bins.iter().find(|r| r.label.trim().is_empty()) {
            return Err(PipelineError::config(format!(
                "binning rule {} has an empty label",
                rule.range
            )));
        }

        let target = split.target.as_str();
        let conflicts = [
            ("columns.drop", self.columns.drop.iter().any(|c| c == target)),
            ("encoding.nominal", self.encoding.nominal.iter().any(|c| c == target)),
            ("encoding.ordinal", self.encoding.ordinal.contains_key(target)),
            ("scaling.columns", self.scaling.columns.iter().any(|c| c == target)),
        ];
        if let Some((section, _)) = conflicts.iter().find(|(_, hit)| *hit) {
            return Err(PipelineError::config(format!(
                "target column '{}' must not appear in {}",
                target, section
            )));
        }

        if let Some(imputer) = &self.missing_values.imputer {
            if imputer.auxiliary.is_empty() {
                return Err(PipelineError::config(
                    "missing_values.imputer.auxiliary must name at least one column",
                ));
            }
            if imputer.backend == ImputerBackend::Llm && imputer.llm.labels.is_empty() {
                return Err(PipelineError::config(
                    "missing_values.imputer.llm.labels must not be empty",
                ));
            }
        }

        let model = &self.model;
        let logistic = &model.logistic_regression;
        if logistic.max_iterations == 0 {
            return Err(PipelineError::config(
                "model.logistic_regression.max_iterations must be positive",
            ));
        }
        if logistic.alpha < 0.0 {
            return Err(PipelineError::config(
                "model.logistic_regression.alpha must be non-negative",
            ));
        }
        let forest = &model.random_forest;
        if forest.n_estimators == 0 {
            return Err(PipelineError::config(
                "model.random_forest.n_estimators must be positive",
            ));
        }
        if forest.max_depth == Some(0) {
            return Err(PipelineError::config(
                "model.random_forest.max_depth must be positive or null",
            ));
        }
        if !(model.decision_threshold > 0.0 && model.decision_threshold < 1.0) {
            return Err(PipelineError::config(format!(
                "model.decision_threshold must be between 0 and 1 (exclusive), got {}",
                model.decision_threshold
            )));
        }

        Ok(())
    }

    /// Name of the derived column produced by the binning stage.
    pub fn binned_column(&self) -> String {
        format!("{}_binned", self.binning.column)
    }
}
