//! Data pipeline: raw table in, cached train/test split out

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use super::binning::CustomBinning;
use super::columns::drop_present;
use super::encoding::{EncoderStore, NominalEncoder, OrdinalEncoder};
use super::imputer::build_imputer;
use super::loader::{load_dataset, LoadOptions};
use super::missing::MissingValueStrategy;
use super::outliers::OutlierDetector;
use super::scaling::{FeatureScaler, FittedScaler};
use super::splitter::{split, DataSplit};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::report::PipelineSummary;

const SCALER_FILE: &str = "scaler.json";

/// Output of a data pipeline run.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub split: DataSplit,
    pub scaler: FittedScaler,
    pub summary: PipelineSummary,
}

/// Runs the feature-engineering stages in their fixed order.
pub struct DataPipeline<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DataPipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    fn scaler_path(&self) -> PathBuf {
        self.config.data.splits_dir().join(SCALER_FILE)
    }

    /// Reuse a cached split unless `force_rebuild`, otherwise build it from
    /// the raw table and cache it.
    pub fn run(&self, force_rebuild: bool) -> Result<PreparedData> {
        let splits_dir = self.config.data.splits_dir();
        if !force_rebuild && DataSplit::exists(&splits_dir) && self.scaler_path().exists() {
            info!(dir = %splits_dir.display(), "using cached train/test split");
            return Ok(PreparedData {
                split: DataSplit::load(&splits_dir)?,
                scaler: load_scaler(&self.scaler_path())?,
                summary: PipelineSummary {
                    from_cache: true,
                    ..Default::default()
                },
            });
        }

        let raw = load_dataset(&self.config.data.path, &LoadOptions::from(&self.config.data))?;
        let (processed, scaler, summary) = self.prepare(raw)?;

        let split_config = &self.config.split;
        let mut data_split = split(
            &processed,
            &split_config.target,
            split_config.test_fraction,
            split_config.seed,
            split_config.strategy,
        )?;
        data_split.save(&splits_dir)?;
        save_scaler(&scaler, &self.scaler_path())?;

        Ok(PreparedData {
            split: data_split,
            scaler,
            summary,
        })
    }

    /// Missing values → outliers → binning → encoding → scaling → column drop.
    ///
    /// Nominal encoder maps are fitted here and written to the encoder store.
    pub fn prepare(&self, df: DataFrame) -> Result<(DataFrame, FittedScaler, PipelineSummary)> {
        let config = self.config;
        let mut summary = PipelineSummary::default();
        summary.record("Ingestion", &df);

        // Missing values: drop critical, mean fill, then predictor imputation
        let mut df = MissingValueStrategy::DropCritical {
            columns: config.columns.critical.clone(),
        }
        .handle(df)?;
        for column in &config.missing_values.fill_mean {
            df = MissingValueStrategy::FillMean {
                column: column.clone(),
            }
            .handle(df)?;
        }
        if let Some(imputer_config) = &config.missing_values.imputer {
            let imputer = build_imputer(imputer_config, &df)?;
            let (imputed, report) = imputer.impute(df)?;
            summary.imputed = report.imputed.len();
            summary.unresolved = report.unresolved.len();
            df = imputed;
        }
        summary.record("Missing values", &df);

        let df = OutlierDetector::default().remove_outliers(df, &config.columns.outlier)?;
        summary.record("Outliers", &df);

        let binning = CustomBinning::new(config.binning.bins.clone());
        let df = binning.bin(df, &config.binning.column)?;
        summary.record("Binning", &df);

        let (df, maps) = NominalEncoder::new(config.encoding.nominal.clone()).fit_transform(df)?;
        let store = EncoderStore::new(config.data.encoders_dir());
        for map in &maps {
            let path = store.save(map)?;
            info!(column = %map.column, path = %path.display(), "saved nominal encoder");
        }
        summary.encoded_columns = maps.iter().map(|m| m.column.clone()).collect();
        let df = OrdinalEncoder::new(config.encoding.ordinal.clone()).transform(df)?;
        summary.record("Encoding", &df);

        let mut scaler = FeatureScaler::new(config.scaling.strategy);
        let df = scaler.fit_scale(df, &config.scaling.columns)?;
        summary.record("Scaling", &df);

        let before: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let df = drop_present(df, &config.columns.drop);
        summary.dropped_columns = before
            .into_iter()
            .filter(|c| df.column(c).is_err())
            .collect();
        summary.record("Column drop", &df);

        Ok((df, scaler.into_fitted()?, summary))
    }
}

fn save_scaler(scaler: &FittedScaler, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::artifact(parent, e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::artifact(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), scaler)
        .map_err(|e| PipelineError::artifact(path, e))
}

fn load_scaler(path: &Path) -> Result<FittedScaler> {
    let file = File::open(path).map_err(|e| PipelineError::artifact(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| PipelineError::artifact(path, e))
}
