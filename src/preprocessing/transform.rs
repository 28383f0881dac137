//! The fitted, immutable transform shared by training and serving

use super::{ColumnSchema, ColumnType, Encoder, Scaler};
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// One input row as received over the wire
pub type Record = serde_json::Map<String, Value>;

/// Result of fitting a [`TransformPipeline`](super::TransformPipeline).
///
/// Holds the input schema and every statistic learned from the training
/// partition. All methods take `&self`; once built it never changes, so a
/// single instance can be shared behind an `Arc` by any number of readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    schema: ColumnSchema,
    scaler: Scaler,
    encoder: Encoder,
    n_samples_seen: usize,
    fitted_at: DateTime<Utc>,
}

impl FittedTransform {
    pub(crate) fn from_parts(
        schema: ColumnSchema,
        scaler: Scaler,
        encoder: Encoder,
        n_samples_seen: usize,
    ) -> Self {
        Self {
            schema,
            scaler,
            encoder,
            n_samples_seen,
            fitted_at: Utc::now(),
        }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Number of rows the transform was fitted on
    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    pub fn fitted_at(&self) -> DateTime<Utc> {
        self.fitted_at
    }

    /// Columns a table must carry to be transformed
    pub fn input_columns(&self) -> Vec<String> {
        self.schema.columns()
    }

    /// Width of the transformed matrix
    pub fn n_features_out(&self) -> usize {
        self.schema.numeric().len() + self.encoder.width()
    }

    /// Output column names: scaled numeric columns, then one-hot columns
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.schema.numeric().to_vec();
        names.extend(self.encoder.feature_names());
        names
    }

    /// Fail with `SchemaMismatch` unless `columns` is exactly the fitted input set
    pub fn check_columns(&self, columns: &[String]) -> Result<()> {
        if self.schema.matches_columns(columns) {
            Ok(())
        } else {
            Err(PipelineError::SchemaMismatch {
                expected: self.input_columns(),
                actual: columns.to_vec(),
            })
        }
    }

    /// Apply the fitted statistics to a table.
    ///
    /// Columns are matched by name. Categories never seen at fit time
    /// produce an all-zero one-hot block.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        self.schema.validate(df)?;

        let n_rows = df.height();
        let n_numeric = self.schema.numeric().len();
        let mut out = Array2::<f64>::zeros((n_rows, self.n_features_out()));

        let scaled: Vec<Vec<f64>> = self
            .schema
            .numeric()
            .par_iter()
            .enumerate()
            .map(|(idx, name)| {
                let column = df.column(name)?;
                self.scaler.scale_column(idx, column)
            })
            .collect::<Result<Vec<_>>>()?;

        for (j, values) in scaled.into_iter().enumerate() {
            for (i, v) in values.into_iter().enumerate() {
                out[[i, j]] = v;
            }
        }

        let mut offset = n_numeric;
        for (idx, (name, vocab)) in self.encoder.vocabularies().iter().enumerate() {
            let column = df.column(name)?;
            for (i, slot) in self.encoder.slots(idx, column)?.into_iter().enumerate() {
                if let Some(s) = slot {
                    out[[i, offset + s]] = 1.0;
                }
            }
            offset += vocab.len();
        }

        Ok(out)
    }

    /// Build a table from JSON records using the fitted schema and transform it.
    ///
    /// Every record must carry exactly the fitted input columns. Numeric
    /// columns take JSON numbers; categorical columns take strings, booleans
    /// or numbers (rendered as text). `null` is a missing value.
    pub fn transform_records(&self, records: &[Record]) -> Result<Array2<f64>> {
        let df = self.records_to_frame(records)?;
        self.transform(&df)
    }

    fn records_to_frame(&self, records: &[Record]) -> Result<DataFrame> {
        for (i, record) in records.iter().enumerate() {
            let missing: Vec<&str> = self
                .schema
                .numeric()
                .iter()
                .chain(self.schema.categorical().iter())
                .filter(|c| !record.contains_key(c.as_str()))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(PipelineError::SchemaError(format!(
                    "record {} is missing column(s): {}",
                    i,
                    missing.join(", ")
                )));
            }
            if let Some(extra) = record.keys().find(|k| self.schema.kind_of(k).is_none()) {
                return Err(PipelineError::SchemaError(format!(
                    "record {} has unexpected column '{}'",
                    i, extra
                )));
            }
        }

        let mut columns: Vec<Column> = Vec::with_capacity(self.schema.len());

        for name in self.schema.numeric() {
            let values = records
                .iter()
                .map(|r| match &r[name.as_str()] {
                    Value::Null => Ok(None),
                    Value::Number(n) => Ok(n.as_f64()),
                    other => Err(Self::wrong_kind(name, ColumnType::Numeric, other)),
                })
                .collect::<Result<Vec<Option<f64>>>>()?;
            columns.push(Series::new(name.as_str().into(), values).into());
        }

        for name in self.schema.categorical() {
            let values = records
                .iter()
                .map(|r| match &r[name.as_str()] {
                    Value::Null => Ok(None),
                    Value::String(s) => Ok(Some(s.clone())),
                    Value::Bool(b) => Ok(Some(b.to_string())),
                    Value::Number(n) => Ok(Some(n.to_string())),
                    other => Err(Self::wrong_kind(name, ColumnType::Categorical, other)),
                })
                .collect::<Result<Vec<Option<String>>>>()?;
            columns.push(Series::new(name.as_str().into(), values).into());
        }

        Ok(DataFrame::new(columns)?)
    }

    fn wrong_kind(column: &str, expected: ColumnType, got: &Value) -> PipelineError {
        PipelineError::SchemaError(format!(
            "column '{}' is {} but received {}",
            column, expected, got
        ))
    }

    /// Persist as a versioned artifact file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::artifacts::write_artifact(path.as_ref(), self)
    }

    /// Load a transform previously written with [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        crate::artifacts::read_artifact(path.as_ref())
    }
}
