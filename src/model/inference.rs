//! Single-record replay of the fitted pipeline
//!
//! The engine must load the model artifact and then the nominal encoder maps
//! before it can predict. Nothing is refitted here.

use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::artifact::ModelArtifact;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::{drop_present, CustomBinning, EncoderMap, EncoderStore, OrdinalEncoder, UnseenCategory};

pub const CHURN_STATUS: &str = "Churn";
pub const NO_CHURN_STATUS: &str = "No Churn";

/// Result of one prediction.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Predicted class, 1 = churn
    pub prediction: usize,
    /// Probability of churn
    pub confidence: f64,
    pub status: String,
    /// Categories the persisted encoders had never seen; encoded as null
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<UnseenCategory>,
}

enum EngineState {
    Uninitialized,
    ModelReady(Box<ModelArtifact>),
    InferenceReady {
        artifact: Box<ModelArtifact>,
        encoders: Vec<EncoderMap>,
    },
}

/// Readiness of an [`InferenceEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Uninitialized,
    ModelReady,
    InferenceReady,
}

pub struct InferenceEngine {
    binning: CustomBinning,
    binning_column: String,
    ordinal: OrdinalEncoder,
    drop_columns: Vec<String>,
    nominal_columns: Vec<String>,
    state: EngineState,
}

impl InferenceEngine {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            binning: CustomBinning::new(config.binning.bins.clone()),
            binning_column: config.binning.column.clone(),
            ordinal: OrdinalEncoder::new(config.encoding.ordinal.clone()),
            drop_columns: config.columns.drop.clone(),
            nominal_columns: config.encoding.nominal.clone(),
            state: EngineState::Uninitialized,
        }
    }

    pub fn status(&self) -> EngineStatus {
        match self.state {
            EngineState::Uninitialized => EngineStatus::Uninitialized,
            EngineState::ModelReady(_) => EngineStatus::ModelReady,
            EngineState::InferenceReady { .. } => EngineStatus::InferenceReady,
        }
    }

    /// Load the model artifact. Any previously loaded encoders are discarded.
    pub fn load_model(&mut self, path: &Path) -> Result<()> {
        let artifact = ModelArtifact::load(path)?;
        self.state = EngineState::ModelReady(Box::new(artifact));
        Ok(())
    }

    /// Load the encoder map of each configured nominal column from `dir`.
    ///
    /// Other files in the directory are ignored.
    pub fn load_encoders(&mut self, dir: &Path) -> Result<()> {
        let artifact = match std::mem::replace(&mut self.state, EngineState::Uninitialized) {
            EngineState::Uninitialized => {
                return Err(PipelineError::NotFitted {
                    component: "inference engine",
                    hint: "load the model before the encoders",
                })
            }
            EngineState::ModelReady(artifact) => artifact,
            EngineState::InferenceReady { artifact, .. } => artifact,
        };

        match self.read_encoders(dir) {
            Ok(encoders) => {
                info!(dir = %dir.display(), encoders = encoders.len(), "encoders loaded");
                self.state = EngineState::InferenceReady { artifact, encoders };
                Ok(())
            }
            Err(e) => {
                self.state = EngineState::ModelReady(artifact);
                Err(e)
            }
        }
    }

    fn read_encoders(&self, dir: &Path) -> Result<Vec<EncoderMap>> {
        if !dir.is_dir() {
            return Err(PipelineError::ArtifactNotFound {
                path: dir.to_path_buf(),
            });
        }
        let store = EncoderStore::new(dir);
        self.nominal_columns.iter().map(|column| store.load(column)).collect()
    }

    /// Encode, bin, scale, and score one record.
    pub fn predict(&self, record: &Map<String, Value>) -> Result<Prediction> {
        let EngineState::InferenceReady { artifact, encoders } = &self.state else {
            return Err(PipelineError::NotFitted {
                component: "inference engine",
                hint: "load the model and the encoders before predicting",
            });
        };

        let mut df = record_to_frame(record)?;
        let mut warnings = Vec::new();
        for encoder in encoders {
            let (encoded, unseen) = encoder.apply(df)?;
            df = encoded;
            warnings.extend(unseen);
        }

        let df = self.binning.bin(df, &self.binning_column)?;
        let df = self.ordinal.transform(df)?;
        let df = artifact.scaler.transform(df)?;
        let df = drop_present(df, &self.drop_columns);

        let classifier = &artifact.classifier;
        let confidence = classifier
            .predict_proba(&df)?
            .first()
            .copied()
            .ok_or_else(|| PipelineError::Model("no probability returned for record".to_string()))?;
        let prediction = usize::from(confidence >= classifier.decision_threshold());
        let status = if prediction == 1 { CHURN_STATUS } else { NO_CHURN_STATUS };

        if !warnings.is_empty() {
            warn!(unseen = warnings.len(), "record contained unseen categories");
        }
        info!(status, confidence, "prediction made");

        Ok(Prediction {
            prediction,
            confidence,
            status: status.to_string(),
            warnings,
        })
    }
}

/// One-row table from a JSON object.
///
/// Integers become Int64, other numbers Float64, strings String, booleans
/// Boolean. A JSON null becomes a Float64 null.
pub fn record_to_frame(record: &Map<String, Value>) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(record.len());
    for (name, value) in record {
        let name = PlSmallStr::from(name.as_str());
        let series = match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Series::new(name, [i]),
                None => Series::new(name, [n.as_f64()]),
            },
            Value::String(s) => Series::new(name, [s.as_str()]),
            Value::Bool(b) => Series::new(name, [*b]),
            Value::Null => Series::new(name, [None::<f64>]),
            Value::Array(_) | Value::Object(_) => {
                return Err(PipelineError::config(format!(
                    "record field '{}' must be a scalar value",
                    name
                )))
            }
        };
        columns.push(series.into_column());
    }
    Ok(DataFrame::new(columns)?)
}
