//! Majority-class baseline

use super::models::Predictor;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Predicts the most frequent training class for every row.
/// Ties go to the smallest class label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MajorityClassifier {
    majority_class: Option<i64>,
    class_counts: BTreeMap<i64, usize>,
    n_features: usize,
}

impl MajorityClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        let counts = super::split::class_counts(y);
        let mut majority: Option<(i64, usize)> = None;
        for (&class, &count) in &counts {
            if majority.map_or(true, |(_, best)| count > best) {
                majority = Some((class, count));
            }
        }
        let (class, _) = majority.ok_or_else(|| {
            PipelineError::DataError("cannot fit a baseline without labels".to_string())
        })?;

        self.majority_class = Some(class);
        self.class_counts = counts;
        self.n_features = x.ncols();
        info!(majority_class = class, samples = y.len(), "Fitted majority-class baseline");
        Ok(self)
    }

    pub fn majority_class(&self) -> Option<i64> {
        self.majority_class
    }

    /// Training class distribution
    pub fn class_counts(&self) -> &BTreeMap<i64, usize> {
        &self.class_counts
    }

    /// Save the model as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a model saved with [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::ArtifactNotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        let model: Self = serde_json::from_reader(BufReader::new(file))?;
        if model.majority_class.is_none() {
            return Err(PipelineError::ModelNotFitted);
        }
        Ok(model)
    }
}

impl Predictor for MajorityClassifier {
    fn name(&self) -> &str {
        "majority_class"
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let class = self.majority_class.ok_or(PipelineError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(Array1::from_elem(x.nrows(), class))
    }

    fn n_features(&self) -> Option<usize> {
        self.majority_class.map(|_| self.n_features)
    }
}
