//! Persisted model artifact

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::classifier::ChurnClassifier;
use crate::config::ModelKind;
use crate::error::{PipelineError, Result};
use crate::pipeline::FittedScaler;

/// Everything inference needs besides the encoder maps.
///
/// The classifier carries the ordered feature columns and their null fill
/// values; the scaler is replayed on incoming records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub classifier: ChurnClassifier,
    pub scaler: FittedScaler,
    pub target_column: String,
    /// RFC 3339 timestamp of training
    pub trained_at: String,
    /// Crate version that produced the artifact
    pub version: String,
}

impl ModelArtifact {
    pub fn new(classifier: ChurnClassifier, scaler: FittedScaler, target_column: impl Into<String>) -> Self {
        Self {
            classifier,
            scaler,
            target_column: target_column.into(),
            trained_at: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.classifier.kind()
    }

    pub fn feature_columns(&self) -> &[String] {
        self.classifier.feature_columns()
    }

    pub fn fill_values(&self) -> &[f64] {
        self.classifier.fill_values()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::artifact(parent, e))?;
        }
        let file = File::create(path).map_err(|e| PipelineError::artifact(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| PipelineError::artifact(path, e))?;
        info!(path = %path.display(), "model artifact saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::ArtifactNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path).map_err(|e| PipelineError::artifact(path, e))?;
        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PipelineError::artifact(path, e))?;
        info!(
            path = %path.display(),
            kind = ?artifact.kind(),
            features = artifact.feature_columns().len(),
            trained_at = %artifact.trained_at,
            "model artifact loaded"
        );
        Ok(artifact)
    }
}
