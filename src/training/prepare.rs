//! Split-and-fit orchestration

use super::split::{take_labels, take_rows, SplitPartition, StratifiedSplit};
use crate::error::{PipelineError, Result};
use crate::preprocessing::{FittedTransform, PreprocessingConfig, TransformPipeline};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration for dataset preparation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    /// Fraction of rows held out for testing, in (0, 1)
    pub test_size: f64,
    /// Seed for the split shuffle
    pub seed: u64,
    pub preprocessing: PreprocessingConfig,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
            preprocessing: PreprocessingConfig::default(),
        }
    }
}

impl PrepareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_preprocessing(mut self, preprocessing: PreprocessingConfig) -> Self {
        self.preprocessing = preprocessing;
        self
    }
}

/// Everything produced by [`prepare_dataset`]
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub transform: FittedTransform,
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
    pub partition: SplitPartition,
}

/// Split `df`/`labels` with a stratified seeded split, fit the transform on
/// the train partition only, and transform both partitions with it.
pub fn prepare_dataset(
    df: &DataFrame,
    labels: &Array1<i64>,
    config: &PrepareConfig,
) -> Result<PreparedDataset> {
    if df.height() != labels.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} labels (one per row)", df.height()),
            actual: format!("{} labels", labels.len()),
        });
    }

    let partition = StratifiedSplit::new(config.test_size, config.seed).split(labels)?;
    let train_df = take_rows(df, &partition.train)?;
    let test_df = take_rows(df, &partition.test)?;

    let transform = TransformPipeline::with_config(config.preprocessing.clone()).fit(&train_df)?;
    let x_train = transform.transform(&train_df)?;
    let x_test = transform.transform(&test_df)?;

    let y_train = take_labels(labels, &partition.train);
    let y_test = take_labels(labels, &partition.test);

    info!(
        train_rows = x_train.nrows(),
        test_rows = x_test.nrows(),
        features = x_train.ncols(),
        seed = config.seed,
        "Prepared dataset"
    );

    Ok(PreparedDataset {
        transform,
        x_train,
        x_test,
        y_train,
        y_test,
        partition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan_data(n: usize) -> (DataFrame, Array1<i64>) {
        let income: Vec<f64> = (0..n).map(|i| 20000.0 + 1000.0 * i as f64).collect();
        let employment: Vec<&str> = (0..n)
            .map(|i| ["salaried", "self_employed", "contract"][i % 3])
            .collect();
        let labels: Vec<i64> = (0..n).map(|i| (i % 2) as i64).collect();
        let df = df!("income" => income, "employment_type" => employment).unwrap();
        (df, Array1::from_vec(labels))
    }

    #[test]
    fn test_shapes_and_alignment() {
        let (df, y) = loan_data(50);
        let prepared = prepare_dataset(&df, &y, &PrepareConfig::default()).unwrap();

        assert_eq!(prepared.x_test.nrows(), 10);
        assert_eq!(prepared.x_train.nrows(), 40);
        assert_eq!(prepared.y_train.len(), 40);
        assert_eq!(prepared.x_train.ncols(), prepared.transform.n_features_out());
        assert_eq!(prepared.transform.n_samples_seen(), 40);

        for (pos, &row) in prepared.partition.test.iter().enumerate() {
            assert_eq!(prepared.y_test[pos], y[row]);
        }
    }

    #[test]
    fn test_fit_uses_train_rows_only() {
        let (df, y) = loan_data(50);
        let prepared = prepare_dataset(&df, &y, &PrepareConfig::default()).unwrap();

        let train_mean = prepared.x_train.column(0).mean().unwrap();
        assert!(train_mean.abs() < 1e-9);

        let expected_center = prepared
            .partition
            .train
            .iter()
            .map(|&i| 20000.0 + 1000.0 * i as f64)
            .sum::<f64>()
            / prepared.partition.train.len() as f64;
        let center = prepared.transform.scaler().params_for("income").unwrap().center;
        assert!((center - expected_center).abs() < 1e-6);
    }

    #[test]
    fn test_misaligned_labels() {
        let (df, _) = loan_data(10);
        let y = Array1::from_vec(vec![0i64; 9]);
        let err = prepare_dataset(&df, &y, &PrepareConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeError { .. }));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let (df, y) = loan_data(40);
        let config = PrepareConfig::new().with_seed(3).with_test_size(0.25);
        let a = prepare_dataset(&df, &y, &config).unwrap();
        let b = prepare_dataset(&df, &y, &config).unwrap();
        assert_eq!(a.x_test, b.x_test);
        assert_eq!(a.y_train, b.y_train);
    }
}
