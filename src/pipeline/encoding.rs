//! Nominal and ordinal categorical encoding, with persisted nominal maps

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::columns::{column_to_string_vec, ensure_columns, replace_column};
use crate::error::{PipelineError, Result};

const ENCODER_SUFFIX: &str = "_encoder.json";

/// A category value that had no code in the map used to encode it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnseenCategory {
    pub column: String,
    pub value: String,
}

/// Learned value → code map for one nominal column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderMap {
    pub column: String,
    pub codes: BTreeMap<String, i64>,
}

impl EncoderMap {
    /// Codes in first-occurrence order starting at 0. Nulls get no code.
    pub fn fit(df: &DataFrame, column: &str) -> Result<Self> {
        ensure_columns(df, &[column], "fit nominal encoder")?;
        let mut codes = BTreeMap::new();
        for value in column_to_string_vec(df.column(column)?)?.into_iter().flatten() {
            let next = codes.len() as i64;
            codes.entry(value).or_insert(next);
        }
        Ok(Self {
            column: column.to_string(),
            codes,
        })
    }

    /// Replace the column with its codes. Unseen values become null and are
    /// reported back.
    pub fn apply(&self, df: DataFrame) -> Result<(DataFrame, Vec<UnseenCategory>)> {
        ensure_columns(&df, &[self.column.as_str()], "apply nominal encoder")?;
        let values = column_to_string_vec(df.column(&self.column)?)?;

        let mut unseen = Vec::new();
        let codes: Vec<Option<i64>> = values
            .into_iter()
            .map(|value| {
                let value = value?;
                let code = self.codes.get(&value).copied();
                if code.is_none() {
                    warn!(column = %self.column, value = %value, "unseen category; encoded as null");
                    unseen.push(UnseenCategory {
                        column: self.column.clone(),
                        value,
                    });
                }
                code
            })
            .collect();

        let df = replace_column(df, Series::new(self.column.as_str().into(), codes))?;
        Ok((df, unseen))
    }
}

/// Learns one [`EncoderMap`] per configured column from the table it is given.
#[derive(Debug, Clone)]
pub struct NominalEncoder {
    columns: Vec<String>,
}

impl NominalEncoder {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn fit_transform(&self, df: DataFrame) -> Result<(DataFrame, Vec<EncoderMap>)> {
        ensure_columns(&df, &self.columns, "nominal encoding")?;

        let mut df = df;
        let mut maps = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let map = EncoderMap::fit(&df, column)?;
            let (encoded, _) = map.apply(df)?;
            df = encoded;
            info!(column = %column, categories = map.codes.len(), "nominal encoder fitted");
            maps.push(map);
        }
        Ok((df, maps))
    }
}

/// Static value → code maps from configuration. Misses become null silently.
///
/// Not idempotent: a second pass looks up the codes themselves, which are not
/// keys of the map, and nulls the column.
#[derive(Debug, Clone, Default)]
pub struct OrdinalEncoder {
    mappings: BTreeMap<String, BTreeMap<String, i64>>,
}

impl OrdinalEncoder {
    pub fn new(mappings: BTreeMap<String, BTreeMap<String, i64>>) -> Self {
        Self { mappings }
    }

    pub fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let columns: Vec<&String> = self.mappings.keys().collect();
        ensure_columns(&df, &columns, "ordinal encoding")?;

        let mut df = df;
        for (column, mapping) in &self.mappings {
            let codes: Vec<Option<i64>> = column_to_string_vec(df.column(column)?)?
                .into_iter()
                .map(|value| value.and_then(|v| mapping.get(&v).copied()))
                .collect();
            df = replace_column(df, Series::new(column.as_str().into(), codes))?;
            info!(column = %column, levels = mapping.len(), "ordinal encoding applied");
        }
        Ok(df)
    }
}

/// Directory of persisted nominal maps, one `<column>_encoder.json` each.
///
/// The directory is created when a map is saved and at no other time.
#[derive(Debug, Clone)]
pub struct EncoderStore {
    dir: PathBuf,
}

impl EncoderStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, column: &str) -> PathBuf {
        self.dir.join(format!("{}{}", column, ENCODER_SUFFIX))
    }

    pub fn save(&self, map: &EncoderMap) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PipelineError::artifact(&self.dir, e))?;

        let path = self.path_for(&map.column);
        let file = File::create(&path).map_err(|e| PipelineError::artifact(&path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &map.codes)
            .map_err(|e| PipelineError::artifact(&path, e))?;
        Ok(path)
    }

    pub fn load(&self, column: &str) -> Result<EncoderMap> {
        read_map(&self.path_for(column), column)
    }

    /// Every persisted map in the directory, ordered by column name.
    pub fn load_all(&self) -> Result<Vec<EncoderMap>> {
        if !self.dir.is_dir() {
            return Err(PipelineError::ArtifactNotFound {
                path: self.dir.clone(),
            });
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| PipelineError::artifact(&self.dir, e))?;
        let mut maps = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PipelineError::artifact(&self.dir, e))?.path();
            let column = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(ENCODER_SUFFIX))
                .map(str::to_string);
            if let Some(column) = column {
                maps.push(read_map(&path, &column)?);
            }
        }
        maps.sort_by(|a, b| a.column.cmp(&b.column));
        Ok(maps)
    }
}

fn read_map(path: &Path, column: &str) -> Result<EncoderMap> {
    if !path.exists() {
        return Err(PipelineError::ArtifactNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| PipelineError::artifact(path, e))?;
    let codes: BTreeMap<String, i64> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| PipelineError::artifact(path, e))?;
    Ok(EncoderMap {
        column: column.to_string(),
        codes,
    })
}
