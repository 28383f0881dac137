//! Predictor trait and classification metrics

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A fitted model that maps a transformed matrix to class labels.
///
/// Implementations are shared across request handlers, so they must be
/// immutable once fitted.
pub trait Predictor: Send + Sync {
    /// Short model name reported by the service
    fn name(&self) -> &str;

    /// Predict one label per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>>;

    /// Number of input features expected, if known
    fn n_features(&self) -> Option<usize> {
        None
    }
}

/// Binary classification metrics, class `1` being the positive class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// `[[tn, fp], [fn, tp]]`, rows are true labels
    pub confusion_matrix: [[usize; 2]; 2],
    pub n_samples: usize,
}

impl ClassificationMetrics {
    /// Compute metrics from true and predicted labels
    pub fn compute(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(PipelineError::DataError(
                "cannot evaluate an empty label vector".to_string(),
            ));
        }

        let (tp, fp, tn, fn_) = Self::confusion_counts(y_true, y_pred);
        let n = y_true.len();

        let accuracy = (tp + tn) as f64 / n as f64;
        let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Ok(Self {
            accuracy,
            precision,
            recall,
            f1_score,
            confusion_matrix: [[tn, fp], [fn_, tp]],
            n_samples: n,
        })
    }

    fn confusion_counts(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> (usize, usize, usize, usize) {
        let mut tp = 0;
        let mut fp = 0;
        let mut tn = 0;
        let mut fn_ = 0;

        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == 1, p == 1) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }

        (tp, fp, tn, fn_)
    }
}
