//! Batch-request client
//!
//! Generates synthetic loan applications, posts them to a running inference
//! server and writes the records with their predictions to CSV.

use crate::error::{PipelineError, Result};
use crate::preprocessing::Record;
use crate::server::PredictResponse;
use crate::utils::DataSaver;
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Name of the prediction column in the output file
pub const PREDICTION_COLUMN: &str = "prediction";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub n_records: usize,
    pub seed: u64,
    pub output: PathBuf,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("MLOPS_PREDICT_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000/predict".to_string()),
            n_records: 1000,
            seed: 42,
            output: PathBuf::from("data/predictions.csv"),
            timeout_secs: 60,
        }
    }
}

impl ClientConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_records(mut self, n: usize) -> Self {
        self.n_records = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}

/// Generate `n` synthetic loan applications. The same seed gives the same records.
pub fn generate_records(n: usize, seed: u64) -> Vec<Record> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let mut record = Record::new();
            record.insert("income".into(), rng.gen_range(20_000i64..=150_000).into());
            record.insert("credit_score".into(), rng.gen_range(300i64..=850).into());
            record.insert("loan_amount".into(), rng.gen_range(5_000i64..=60_000).into());
            record.insert("years_employed".into(), rng.gen_range(0i64..=30).into());
            record.insert("points".into(), rng.gen_range(0i64..=100).into());
            record
        })
        .collect()
}

/// Post a batch to the prediction endpoint
pub async fn send_batch(
    url: &str,
    records: &[Record],
    timeout: Duration,
) -> anyhow::Result<PredictResponse> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.post(url).json(records).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("server returned {}: {}", status, body);
    }

    let parsed: PredictResponse = response.json().await?;
    if parsed.predictions.len() != records.len() {
        anyhow::bail!(
            "received {} predictions for {} records",
            parsed.predictions.len(),
            records.len()
        );
    }
    Ok(parsed)
}

/// Build a table from records. Columns come from the first record's keys,
/// which `serde_json::Map` keeps sorted by name.
pub fn records_to_frame(records: &[Record]) -> Result<DataFrame> {
    let names: Vec<String> = records
        .first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default();

    let mut columns: Vec<Column> = Vec::with_capacity(names.len());
    for name in &names {
        let values: Vec<Value> = records
            .iter()
            .map(|r| r.get(name).cloned().unwrap_or(Value::Null))
            .collect();

        let column = if values.iter().all(|v| v.is_i64() || v.is_null()) {
            let data: Vec<Option<i64>> = values.iter().map(|v| v.as_i64()).collect();
            Column::new(name.as_str().into(), data)
        } else if values.iter().all(|v| v.is_number() || v.is_null()) {
            let data: Vec<Option<f64>> = values.iter().map(|v| v.as_f64()).collect();
            Column::new(name.as_str().into(), data)
        } else {
            let data: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect();
            Column::new(name.as_str().into(), data)
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}

/// Write records plus a `prediction` column to CSV
pub fn write_predictions(records: &[Record], predictions: &[i64], path: &Path) -> Result<()> {
    if records.len() != predictions.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} predictions", records.len()),
            actual: format!("{} predictions", predictions.len()),
        });
    }

    let mut df = records_to_frame(records)?;
    df.with_column(Column::new(PREDICTION_COLUMN.into(), predictions))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    DataSaver::save_csv(&mut df, path)?;
    info!(path = %path.display(), rows = df.height(), "Wrote predictions");
    Ok(())
}

/// Approved/rejected counts of a predictions table
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSummary {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl PredictionSummary {
    pub fn from_predictions(predictions: &[i64]) -> Self {
        let approved = predictions.iter().filter(|&&p| p == 1).count();
        let rejected = predictions.iter().filter(|&&p| p == 0).count();
        Self {
            total: predictions.len(),
            approved,
            rejected,
        }
    }

    /// Summarize the `prediction` column of a table
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let column = df
            .column(PREDICTION_COLUMN)
            .map_err(|_| PipelineError::FeatureNotFound(PREDICTION_COLUMN.to_string()))?;
        let predictions = crate::utils::labels_from_column(column)?;
        Ok(Self::from_predictions(&predictions.to_vec()))
    }

    /// Share of approved rows, 0 for an empty table
    pub fn approval_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.approved as f64 / self.total as f64
        }
    }
}
