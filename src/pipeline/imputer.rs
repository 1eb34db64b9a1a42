//! Predictor-backed imputation of a categorical column
//!
//! The predictor is an injected capability. Each affected row is predicted
//! independently (in parallel), and a failed or empty prediction leaves only
//! that row's cell missing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{info, warn};

use super::columns::{column_to_string_vec, ensure_columns, replace_column};
use crate::config::{ImputerBackend, ImputerConfig};
use crate::error::{PipelineError, Result};

/// Something that can guess a missing value from a row's auxiliary values.
pub trait ValuePredictor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Predict a value from the auxiliary values of one row, in the order the
    /// imputer was configured with. `Ok(None)` means "no answer".
    fn predict(&self, auxiliary: &[&str]) -> anyhow::Result<Option<String>>;
}

/// Outcome of one imputation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputationReport {
    /// Row index and imputed value for every successful prediction
    pub imputed: Vec<(usize, String)>,
    /// Rows that are still missing after the pass
    pub unresolved: Vec<usize>,
}

pub struct CustomImputer {
    target: String,
    auxiliary: Vec<String>,
    predictor: Box<dyn ValuePredictor>,
}

impl CustomImputer {
    pub fn new(
        target: impl Into<String>,
        auxiliary: Vec<String>,
        predictor: Box<dyn ValuePredictor>,
    ) -> Self {
        Self {
            target: target.into(),
            auxiliary,
            predictor,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Fill missing values of the target column using the predictor.
    ///
    /// The imputed column is written back as a String column.
    pub fn impute(&self, df: DataFrame) -> Result<(DataFrame, ImputationReport)> {
        let mut required = vec![self.target.clone()];
        required.extend(self.auxiliary.iter().cloned());
        ensure_columns(&df, &required, "impute missing values")?;

        let mut values = column_to_string_vec(df.column(&self.target)?)?;
        let auxiliary: Vec<Vec<Option<String>>> = self
            .auxiliary
            .iter()
            .map(|name| column_to_string_vec(df.column(name)?))
            .collect::<Result<_>>()?;

        let missing_rows: Vec<usize> = values
            .iter()
            .enumerate()
            .filter_map(|(idx, v)| if v.is_none() { Some(idx) } else { None })
            .collect();

        if missing_rows.is_empty() {
            return Ok((df, ImputationReport::default()));
        }

        let pb = ProgressBar::new(missing_rows.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("   Imputing [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%) [{eta}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        let progress_counter = AtomicU64::new(0);

        let predictions: Vec<(usize, Result<Option<String>>)> = missing_rows
            .par_iter()
            .map(|&row| {
                let row_values: Vec<&str> = auxiliary
                    .iter()
                    .map(|col| col[row].as_deref().unwrap_or(""))
                    .collect();

                let result = self
                    .predictor
                    .predict(&row_values)
                    .map_err(|e| PipelineError::Imputation {
                        row,
                        reason: e.to_string(),
                    });

                let count = progress_counter.fetch_add(1, Ordering::Relaxed);
                pb.set_position(count + 1);

                (row, result)
            })
            .collect();
        pb.finish_and_clear();

        let mut report = ImputationReport::default();
        for (row, result) in predictions {
            match result {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    values[row] = Some(value.clone());
                    report.imputed.push((row, value));
                }
                Ok(_) => {
                    warn!(row, predictor = self.predictor.name(), "no prediction; value left missing");
                    report.unresolved.push(row);
                }
                Err(e) => {
                    warn!(predictor = self.predictor.name(), "{}", e);
                    report.unresolved.push(row);
                }
            }
        }

        info!(
            column = %self.target,
            predictor = self.predictor.name(),
            imputed = report.imputed.len(),
            unresolved = report.unresolved.len(),
            "imputed missing values"
        );

        let df = replace_column(df, Series::new(self.target.as_str().into(), values))?;
        Ok((df, report))
    }
}

/// Statistical predictor: the most frequent target value seen for a key.
///
/// The key is the normalized (trimmed, lowercased) first auxiliary value.
/// Ties are broken by first occurrence.
#[derive(Debug, Clone, Default)]
pub struct FrequencyPredictor {
    lookup: HashMap<String, String>,
}

impl FrequencyPredictor {
    /// Learn key → value frequencies from the rows where `target` is known.
    pub fn fit(df: &DataFrame, key_column: &str, target: &str) -> Result<Self> {
        ensure_columns(df, &[key_column, target], "fit frequency predictor")?;
        let keys = column_to_string_vec(df.column(key_column)?)?;
        let targets = column_to_string_vec(df.column(target)?)?;

        // Per key: (value, count) in first-seen order
        let mut counts: HashMap<String, Vec<(String, usize)>> = HashMap::new();
        for (key, value) in keys.iter().zip(targets.iter()) {
            let (Some(key), Some(value)) = (key, value) else {
                continue;
            };
            let entry = counts.entry(normalize_key(key)).or_default();
            match entry.iter_mut().find(|(v, _)| v == value) {
                Some((_, n)) => *n += 1,
                None => entry.push((value.clone(), 1)),
            }
        }

        let lookup = counts
            .into_iter()
            .filter_map(|(key, values)| {
                let mut best: Option<&(String, usize)> = None;
                for candidate in &values {
                    if best.map_or(true, |b| candidate.1 > b.1) {
                        best = Some(candidate);
                    }
                }
                best.map(|(value, _)| (key, value.clone()))
            })
            .collect();

        Ok(Self { lookup })
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

impl ValuePredictor for FrequencyPredictor {
    fn name(&self) -> &str {
        "frequency"
    }

    fn predict(&self, auxiliary: &[&str]) -> anyhow::Result<Option<String>> {
        let key = auxiliary
            .first()
            .ok_or_else(|| anyhow::anyhow!("no auxiliary value supplied"))?;
        Ok(self.lookup.get(&normalize_key(key)).cloned())
    }
}

#[cfg(feature = "llm-imputer")]
pub use self::llm::ChatCompletionPredictor;

/// Who the prompt asks about: first and last name when both are known.
pub fn prompt_subject(auxiliary: &[&str]) -> String {
    match auxiliary {
        [first, last, ..] => format!("first name '{}' and last name '{}'", first, last),
        [first] => format!("first name '{}'", first),
        [] => "no name".to_string(),
    }
}

/// One-word question sent to a chat-completion service.
pub fn imputation_prompt(labels: &[String], auxiliary: &[&str]) -> String {
    format!(
        "What is the most probable gender ({}) for a person with the {}? \
         Your answer should consist of only one word: {}.",
        labels.join("/"),
        prompt_subject(auxiliary),
        labels
            .iter()
            .map(|l| format!("'{}'", l))
            .collect::<Vec<_>>()
            .join(" or ")
    )
}

/// Map a free-text answer onto an allowed label.
///
/// Surrounding whitespace, quotes and full stops are ignored and the match
/// is case-insensitive. Anything else is no answer.
pub fn accept_answer(labels: &[String], raw: &str) -> Option<String> {
    let answer = raw
        .trim()
        .trim_matches(|c: char| c == '.' || c == '\'' || c == '"');
    if answer.is_empty() {
        return None;
    }
    labels
        .iter()
        .find(|label| label.eq_ignore_ascii_case(answer))
        .cloned()
}

#[cfg(feature = "llm-imputer")]
mod llm {
    use std::time::Duration;

    use anyhow::Context;
    use reqwest::blocking::Client;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

    use super::{accept_answer, imputation_prompt, ValuePredictor};
    use crate::config::LlmConfig;
    use crate::error::{PipelineError, Result};

    /// External-service predictor speaking the OpenAI chat-completions protocol.
    ///
    /// The service is untrusted: answers outside the allowed labels are
    /// treated as "no answer".
    pub struct ChatCompletionPredictor {
        client: Client,
        endpoint: String,
        model: String,
        api_key: String,
        labels: Vec<String>,
    }

    impl ChatCompletionPredictor {
        pub fn new(config: &LlmConfig) -> Result<Self> {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                PipelineError::Configuration(format!(
                    "environment variable {} must hold the imputation service API key",
                    config.api_key_env
                ))
            })?;
            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| PipelineError::Configuration(format!("cannot build HTTP client: {}", e)))?;

            Ok(Self {
                client,
                endpoint: config.endpoint.clone(),
                model: config.model.clone(),
                api_key,
                labels: config.labels.clone(),
            })
        }

    }

    impl ValuePredictor for ChatCompletionPredictor {
        fn name(&self) -> &str {
            "chat-completion"
        }

        fn predict(&self, auxiliary: &[&str]) -> anyhow::Result<Option<String>> {
            let body = serde_json::json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": imputation_prompt(&self.labels, auxiliary) }],
                "temperature": 0,
            });

            let response = self
                .client
                .post(&self.endpoint)
                .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
                .header(CONTENT_TYPE, "application/json")
                .json(&body)
                .send()
                .context("imputation service request failed")?
                .error_for_status()
                .context("imputation service returned an error status")?;

            let js: serde_json::Value = response
                .json()
                .context("imputation service returned malformed JSON")?;
            let answer = js["choices"][0]["message"]["content"].as_str().unwrap_or("");
            Ok(accept_answer(&self.labels, answer))
        }
    }
}

/// Build the configured predictor. The frequency backend is fitted on `df`.
pub fn build_imputer(config: &ImputerConfig, df: &DataFrame) -> Result<CustomImputer> {
    let predictor: Box<dyn ValuePredictor> = match config.backend {
        ImputerBackend::Frequency => {
            let key = config.auxiliary.first().ok_or_else(|| {
                PipelineError::config("imputer needs at least one auxiliary column")
            })?;
            Box::new(FrequencyPredictor::fit(df, key, &config.target)?)
        }
        #[cfg(feature = "llm-imputer")]
        ImputerBackend::Llm => Box::new(ChatCompletionPredictor::new(&config.llm)?),
        #[cfg(not(feature = "llm-imputer"))]
        ImputerBackend::Llm => {
            return Err(PipelineError::config(
                "the llm imputer backend requires the 'llm-imputer' feature",
            ))
        }
    };

    Ok(CustomImputer::new(
        config.target.clone(),
        config.auxiliary.clone(),
        predictor,
    ))
}
