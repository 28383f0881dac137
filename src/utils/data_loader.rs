//! Data loading utilities

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Label column of the loan dataset's separate target file
pub const DEFAULT_LABEL_COLUMN: &str = "loan_approved";

/// Data loader for CSV, JSON and Parquet tables
pub struct DataLoader {
    /// Rows scanned to infer CSV dtypes
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(100),
        }
    }

    /// Set how many rows are scanned for dtype inference (`None` scans all)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    fn open(path: &Path) -> Result<File> {
        File::open(path).map_err(|e| {
            PipelineError::DataError(format!("cannot open {}: {}", path.display(), e))
        })
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        self.load_csv_with_separator(path, b',')
    }

    fn load_csv_with_separator(&self, path: impl AsRef<Path>, separator: u8) -> Result<DataFrame> {
        let file = Self::open(path.as_ref())?;

        let parse_opts = CsvParseOptions::default().with_separator(separator);

        let reader = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file);

        Ok(reader.finish()?)
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let file = Self::open(path.as_ref())?;
        Ok(ParquetReader::new(file).finish()?)
    }

    /// Load a JSON file (array of records)
    pub fn load_json(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let file = Self::open(path.as_ref())?;
        Ok(JsonReader::new(file).finish()?)
    }

    /// Detect file format from extension and load
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let df = match ext.as_str() {
            "tsv" => self.load_csv_with_separator(path, b'\t')?,
            "parquet" | "pq" => self.load_parquet(path)?,
            "json" => self.load_json(path)?,
            // CSV is the default
            _ => self.load_csv(path)?,
        };

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded table");
        Ok(df)
    }

    /// Load features and labels from two files of equal length.
    ///
    /// The label file's `label_column` is used when given; otherwise
    /// [`DEFAULT_LABEL_COLUMN`], or the file's only column.
    pub fn load_features_and_labels(
        &self,
        features: impl AsRef<Path>,
        labels: impl AsRef<Path>,
        label_column: Option<&str>,
    ) -> Result<(DataFrame, Array1<i64>)> {
        let df = self.load_auto(features)?;
        let label_df = self.load_auto(labels)?;

        let column = match label_column {
            Some(name) => label_df
                .column(name)
                .map_err(|_| PipelineError::FeatureNotFound(name.to_string()))?,
            None => match label_df.column(DEFAULT_LABEL_COLUMN) {
                Ok(c) => c,
                Err(_) if label_df.width() == 1 => &label_df.get_columns()[0],
                Err(_) => {
                    return Err(PipelineError::FeatureNotFound(format!(
                        "{} (label file has {} columns)",
                        DEFAULT_LABEL_COLUMN,
                        label_df.width()
                    )))
                }
            },
        };

        let y = labels_from_column(column)?;
        if y.len() != df.height() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} labels (one per feature row)", df.height()),
                actual: format!("{} labels", y.len()),
            });
        }
        Ok((df, y))
    }
}

/// Split the target column out of a table
pub fn split_target(df: &DataFrame, target: &str) -> Result<(DataFrame, Array1<i64>)> {
    let column = df
        .column(target)
        .map_err(|_| PipelineError::FeatureNotFound(target.to_string()))?;
    let y = labels_from_column(column)?;
    let features = df.drop(target)?;
    Ok((features, y))
}

/// Convert a label column to integer classes.
///
/// Booleans map to 0/1. Strings may be `true`/`false` (any case) or
/// integers. Floats must be whole numbers. Nulls are rejected.
pub fn labels_from_column(column: &Column) -> Result<Array1<i64>> {
    let name = column.name().to_string();
    if column.null_count() > 0 {
        return Err(PipelineError::DataError(format!(
            "label column '{}' contains {} null value(s)",
            name,
            column.null_count()
        )));
    }

    let values: Vec<i64> = match column.dtype() {
        DataType::Boolean => column.bool()?.into_no_null_iter().map(i64::from).collect(),
        DataType::Float32 | DataType::Float64 => {
            let casted = column.cast(&DataType::Float64)?;
            casted
                .f64()?
                .into_no_null_iter()
                .map(|v| {
                    if v.fract() == 0.0 && v.is_finite() {
                        Ok(v as i64)
                    } else {
                        Err(PipelineError::DataError(format!(
                            "label column '{}' has non-integral value {}",
                            name, v
                        )))
                    }
                })
                .collect::<Result<_>>()?
        }
        DataType::String => column
            .str()?
            .into_no_null_iter()
            .map(|s| parse_label(&name, s))
            .collect::<Result<_>>()?,
        dtype if dtype.is_integer() => {
            let casted = column.cast(&DataType::Int64)?;
            casted.i64()?.into_no_null_iter().collect()
        }
        other => {
            return Err(PipelineError::DataError(format!(
                "label column '{}' has unsupported dtype {}",
                name, other
            )))
        }
    };

    Ok(Array1::from_vec(values))
}

fn parse_label(column: &str, raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(1)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(0)
    } else {
        trimmed.parse::<i64>().map_err(|_| {
            PipelineError::DataError(format!(
                "label column '{}' has unparseable value '{}'",
                column, raw
            ))
        })
    }
}

/// Table writers
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        CsvWriter::new(&mut file).finish(df)?;
        Ok(())
    }
}
