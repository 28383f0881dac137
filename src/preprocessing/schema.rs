//! Column classification and schema validation

use crate::error::{PipelineError, Result};
use super::ColumnType;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whether a dtype is treated as a numeric feature.
///
/// Integer and floating kinds are numeric; everything else is categorical.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
        DataType::Float32 | DataType::Float64
    )
}

/// Input schema of a transform: ordered numeric and categorical column names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    numeric: Vec<String>,
    categorical: Vec<String>,
}

impl ColumnSchema {
    /// Build a schema from explicit column lists
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for name in numeric.iter().chain(categorical.iter()) {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::SchemaError(format!(
                    "column '{}' listed more than once",
                    name
                )));
            }
        }
        Ok(Self { numeric, categorical })
    }

    /// Partition the columns of `df` into numeric and categorical sets,
    /// preserving table order. Columns named in `exclude` are skipped.
    pub fn classify(df: &DataFrame, exclude: &[String]) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for col in df.get_columns() {
            let name = col.name().to_string();
            if exclude.contains(&name) {
                continue;
            }
            if is_numeric_dtype(col.dtype()) {
                numeric.push(name);
            } else {
                categorical.push(name);
            }
        }

        Self { numeric, categorical }
    }

    /// Numeric column names in fit order
    pub fn numeric(&self) -> &[String] {
        &self.numeric
    }

    /// Categorical column names in fit order
    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// All expected input columns: numeric first, then categorical
    pub fn columns(&self) -> Vec<String> {
        self.numeric.iter().chain(self.categorical.iter()).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind assigned to `name`, if the column belongs to the schema
    pub fn kind_of(&self, name: &str) -> Option<ColumnType> {
        if self.numeric.iter().any(|c| c == name) {
            Some(ColumnType::Numeric)
        } else if self.categorical.iter().any(|c| c == name) {
            Some(ColumnType::Categorical)
        } else {
            None
        }
    }

    /// True when `columns` names exactly the expected column set (order-insensitive)
    pub fn matches_columns(&self, columns: &[String]) -> bool {
        let expected: BTreeSet<&str> = self.numeric.iter().chain(self.categorical.iter()).map(String::as_str).collect();
        let actual: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
        expected == actual && columns.len() == actual.len()
    }

    /// Check a table against the schema before any computation.
    ///
    /// Fails on missing columns, unexpected columns, and numeric columns
    /// whose dtype is no longer numeric (or categorical columns that became numeric).
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        let present: BTreeSet<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let missing: Vec<&str> = self
            .numeric
            .iter()
            .chain(self.categorical.iter())
            .filter(|c| !present.contains(*c))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::SchemaError(format!(
                "missing expected column(s): {}",
                missing.join(", ")
            )));
        }

        let unexpected: Vec<&str> = present
            .iter()
            .filter(|c| self.kind_of(c).is_none())
            .map(String::as_str)
            .collect();
        if !unexpected.is_empty() {
            return Err(PipelineError::SchemaError(format!(
                "unexpected column(s) not seen at fit time: {}",
                unexpected.join(", ")
            )));
        }

        for col in df.get_columns() {
            let name = col.name().as_str();
            let numeric_now = is_numeric_dtype(col.dtype());
            match self.kind_of(name) {
                Some(ColumnType::Numeric) if !numeric_now => {
                    return Err(PipelineError::SchemaError(format!(
                        "column '{}' was numeric at fit time but has dtype {}",
                        name,
                        col.dtype()
                    )));
                }
                Some(ColumnType::Categorical) if numeric_now => {
                    return Err(PipelineError::SchemaError(format!(
                        "column '{}' was categorical at fit time but has dtype {}",
                        name,
                        col.dtype()
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}
