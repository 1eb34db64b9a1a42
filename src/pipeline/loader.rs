//! Dataset ingestion for delimited text, Parquet and spreadsheet files

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use tracing::info;

use crate::config::DataConfig;
use crate::error::{PipelineError, Result};

/// Reader settings taken from the `data` configuration section.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub separator: Option<char>,
    /// Rows used for CSV schema inference; 0 scans the whole file
    pub infer_schema_length: usize,
    pub sheet: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            separator: None,
            infer_schema_length: 10_000,
            sheet: None,
        }
    }
}

impl From<&DataConfig> for LoadOptions {
    fn from(config: &DataConfig) -> Self {
        Self {
            separator: config.separator,
            infer_schema_length: config.infer_schema_length,
            sheet: config.sheet.clone(),
        }
    }
}

/// Shape and size of a loaded table.
#[derive(Debug, Clone, Copy)]
pub struct DatasetStats {
    pub rows: usize,
    pub cols: usize,
    pub memory_mb: f64,
}

impl DatasetStats {
    pub fn of(df: &DataFrame) -> Self {
        let (rows, cols) = df.shape();
        Self {
            rows,
            cols,
            memory_mb: df.estimated_size() as f64 / (1024.0 * 1024.0),
        }
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ingestion_error(path: &Path, reason: impl ToString) -> PipelineError {
    PipelineError::Ingestion {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Load a raw table, choosing the reader from the file extension.
pub fn load_dataset(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ingestion_error(path, "file does not exist"));
    }

    let extension = extension_of(path);
    let df = match extension.as_str() {
        "csv" | "tsv" | "txt" => {
            let separator = options
                .separator
                .unwrap_or(if extension == "tsv" { '\t' } else { ',' });
            load_delimited(path, separator, options.infer_schema_length)?
        }
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .and_then(|lf| lf.collect())
            .map_err(|e| ingestion_error(path, e))?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => {
            load_spreadsheet(path, options.sheet.as_deref())?
        }
        _ => {
            return Err(ingestion_error(
                path,
                format!(
                    "unsupported file format '{}'. Supported formats: csv, tsv, parquet, xlsx, xls, ods",
                    extension
                ),
            ))
        }
    };

    let stats = DatasetStats::of(&df);
    info!(
        path = %path.display(),
        rows = stats.rows,
        cols = stats.cols,
        "dataset loaded"
    );
    Ok(df)
}

fn load_delimited(path: &Path, separator: char, infer_schema_length: usize) -> Result<DataFrame> {
    if !separator.is_ascii() {
        return Err(ingestion_error(
            path,
            format!("separator '{}' is not a single-byte character", separator),
        ));
    }

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_separator(separator as u8)
        .with_infer_schema_length(schema_length)
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| ingestion_error(path, e))
}

fn load_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ingestion_error(path, e))?;

    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|e| ingestion_error(path, e))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ingestion_error(path, "workbook contains no worksheets"))?
            .map_err(|e| ingestion_error(path, e))?,
    };

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| ingestion_error(path, "worksheet is empty (no header row)"))?
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("column_{}", idx),
            other => other.to_string(),
        })
        .collect();

    let mut cells: Vec<Vec<Data>> = vec![Vec::new(); header.len()];
    for row in rows {
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(row.get(idx).cloned().unwrap_or(Data::Empty));
        }
    }

    let columns: Vec<Column> = header
        .iter()
        .zip(cells)
        .map(|(name, values)| spreadsheet_column(name, &values).into_column())
        .collect();

    DataFrame::new(columns).map_err(|e| ingestion_error(path, e))
}

/// Build a typed series from raw worksheet cells.
///
/// Int64 when every non-empty cell is integral, Float64 when every non-empty
/// cell is numeric, Boolean when every non-empty cell is a boolean, String
/// otherwise. Empty cells become nulls.
fn spreadsheet_column(name: &str, values: &[Data]) -> Series {
    let non_empty = || values.iter().filter(|v| !matches!(v, Data::Empty));

    let all_integral = non_empty().all(|v| match v {
        Data::Int(_) => true,
        Data::Float(f) => f.fract() == 0.0 && f.is_finite(),
        _ => false,
    });
    let all_numeric = non_empty().all(|v| matches!(v, Data::Int(_) | Data::Float(_)));
    let all_bool = non_empty().all(|v| matches!(v, Data::Bool(_)));
    let has_values = non_empty().next().is_some();

    if has_values && all_integral {
        let ints: Vec<Option<i64>> = values
            .iter()
            .map(|v| match v {
                Data::Int(i) => Some(*i),
                Data::Float(f) => Some(*f as i64),
                _ => None,
            })
            .collect();
        Series::new(name.into(), ints)
    } else if has_values && all_numeric {
        let floats: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                Data::Int(i) => Some(*i as f64),
                Data::Float(f) => Some(*f),
                _ => None,
            })
            .collect();
        Series::new(name.into(), floats)
    } else if has_values && all_bool {
        let bools: Vec<Option<bool>> = values
            .iter()
            .map(|v| match v {
                Data::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        Series::new(name.into(), bools)
    } else {
        let strings: Vec<Option<String>> = values
            .iter()
            .map(|v| match v {
                Data::Empty => None,
                Data::String(s) if s.trim().is_empty() => None,
                other => Some(other.to_string()),
            })
            .collect();
        Series::new(name.into(), strings)
    }
}

/// Save a table as CSV or Parquet depending on the extension.
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::artifact(parent, e))?;
    }

    let extension = extension_of(path);
    match extension.as_str() {
        "csv" => {
            let mut file =
                std::fs::File::create(path).map_err(|e| PipelineError::artifact(path, e))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .map_err(|e| PipelineError::artifact(path, e))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path).map_err(|e| PipelineError::artifact(path, e))?;
            ParquetWriter::new(file)
                .finish(df)
                .map_err(|e| PipelineError::artifact(path, e))?;
        }
        _ => {
            return Err(PipelineError::artifact(
                path,
                format!(
                    "unsupported output format '{}'. Supported formats: csv, parquet",
                    extension
                ),
            ))
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreadsheet_column_inference() {
        let ints = spreadsheet_column("n", &[Data::Float(1.0), Data::Empty, Data::Int(3)]);
        assert_eq!(ints.dtype(), &DataType::Int64);
        assert_eq!(ints.null_count(), 1);

        let floats = spreadsheet_column("x", &[Data::Float(1.5), Data::Int(2)]);
        assert_eq!(floats.dtype(), &DataType::Float64);

        let text = spreadsheet_column("s", &[Data::String("a".into()), Data::Int(2)]);
        assert_eq!(text.dtype(), &DataType::String);
    }

    #[test]
    fn test_all_empty_column_is_string_nulls() {
        let s = spreadsheet_column("e", &[Data::Empty, Data::Empty]);
        assert_eq!(s.dtype(), &DataType::String);
        assert_eq!(s.null_count(), 2);
    }
}
