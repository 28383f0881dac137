//! Evaluation results shared between training and reporting

use super::models::ClassificationMetrics;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Default file name, stored next to the model files
pub const RESULTS_FILE: &str = "model_results.json";

/// Train and test metrics of one evaluated model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: String,
    pub train: ClassificationMetrics,
    pub test: ClassificationMetrics,
    pub evaluated_at: DateTime<Utc>,
}

impl ModelResult {
    pub fn new(model: impl Into<String>, train: ClassificationMetrics, test: ClassificationMetrics) -> Self {
        Self {
            model: model.into(),
            train,
            test,
            evaluated_at: Utc::now(),
        }
    }
}

/// Results table, one row per model name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResults {
    pub models: Vec<ModelResult>,
}

impl ModelResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result, replacing an earlier one for the same model
    pub fn record(&mut self, result: ModelResult) -> &mut Self {
        match self.models.iter_mut().find(|r| r.model == result.model) {
            Some(existing) => *existing = result,
            None => self.models.push(result),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Model with the highest test F1. Ties keep the earlier entry.
    pub fn best_by_f1(&self) -> Option<&ModelResult> {
        self.models.iter().fold(None, |best: Option<&ModelResult>, r| match best {
            Some(b) if b.test.f1_score >= r.test.f1_score => Some(b),
            _ => Some(r),
        })
    }

    pub fn best_test_accuracy(&self) -> Option<f64> {
        self.models.iter().map(|r| r.test.accuracy).reduce(f64::max)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::ArtifactNotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Load the table at `path`, or start an empty one if there is none
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(path) {
            Err(PipelineError::ArtifactNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }
}
