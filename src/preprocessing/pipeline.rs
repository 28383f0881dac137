//! Data preprocessing pipeline

use super::{
    config::PreprocessingConfig, ColumnSchema, Encoder, FittedTransform, Scaler,
};
use crate::error::{PipelineError, Result};
use ndarray::Array2;
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Unfitted transform pipeline: a numeric scaling branch and a categorical
/// one-hot branch.
///
/// Fitting never mutates the pipeline; each call to [`fit`](Self::fit)
/// returns an independent [`FittedTransform`].
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    config: PreprocessingConfig,
}

impl TransformPipeline {
    /// Create a new pipeline with default configuration
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a new pipeline with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Fit both branches on `df`
    pub fn fit(&self, df: &DataFrame) -> Result<FittedTransform> {
        let start = Instant::now();

        if df.height() == 0 {
            return Err(PipelineError::DataError(
                "cannot fit a transform on an empty table".to_string(),
            ));
        }

        let schema = ColumnSchema::classify(df, &self.config.exclude_columns);
        if schema.is_empty() {
            return Err(PipelineError::DataError(
                "no feature columns left to fit".to_string(),
            ));
        }
        debug!(
            numeric = ?schema.numeric(),
            categorical = ?schema.categorical(),
            "Classified columns"
        );

        let mut scaler = Scaler::new(self.config.scaler_type).with_ddof(self.config.ddof);
        scaler.fit(df, schema.numeric())?;

        let mut encoder = Encoder::new();
        encoder.fit(df, schema.categorical())?;

        let fitted = FittedTransform::from_parts(schema, scaler, encoder, df.height());

        info!(
            rows = df.height(),
            features_in = fitted.schema().len(),
            features_out = fitted.n_features_out(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted transform pipeline"
        );

        Ok(fitted)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&self, df: &DataFrame) -> Result<(FittedTransform, Array2<f64>)> {
        let fitted = self.fit(df)?;
        let matrix = fitted.transform(df)?;
        Ok((fitted, matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::ScalerType;

    fn create_test_dataframe() -> DataFrame {
        DataFrame::new(vec![
            Series::new("age".into(), &[25.0, 30.0, 35.0, 40.0, 45.0]).into(),
            Series::new("income".into(), &[50000.0, 60000.0, 70000.0, 80000.0, 90000.0]).into(),
            Series::new("city".into(), &["NYC", "LA", "NYC", "SF", "LA"]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_column_detection() {
        let fitted = TransformPipeline::new().fit(&create_test_dataframe()).unwrap();
        assert_eq!(fitted.schema().numeric(), &["age".to_string(), "income".to_string()]);
        assert_eq!(fitted.schema().categorical(), &["city".to_string()]);
    }

    #[test]
    fn test_fit_transform_shape() {
        let df = create_test_dataframe();
        let (fitted, x) = TransformPipeline::new().fit_transform(&df).unwrap();
        // 2 numeric + LA, NYC, SF
        assert_eq!(x.dim(), (5, 5));
        assert_eq!(fitted.n_samples_seen(), 5);
    }

    #[test]
    fn test_training_columns_are_centered() {
        let df = create_test_dataframe();
        let (_, x) = TransformPipeline::new().fit_transform(&df).unwrap();
        for j in 0..2 {
            let mean = x.column(j).mean().unwrap();
            assert!(mean.abs() < 1e-9);
        }
    }

    #[test]
    fn test_excluded_columns_are_ignored() {
        let df = create_test_dataframe();
        let pipeline = TransformPipeline::with_config(PreprocessingConfig::new().exclude("city"));
        let fitted = pipeline.fit(&df).unwrap();
        assert!(fitted.schema().categorical().is_empty());
        assert_eq!(fitted.n_features_out(), 2);
    }

    #[test]
    fn test_minmax_config_is_applied() {
        let df = create_test_dataframe();
        let pipeline =
            TransformPipeline::with_config(PreprocessingConfig::new().with_scaler(ScalerType::MinMax));
        let (_, x) = pipeline.fit_transform(&df).unwrap();
        assert_eq!(x[[0, 0]], 0.0);
        assert_eq!(x[[4, 0]], 1.0);
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let df = create_test_dataframe().head(Some(0));
        let err = TransformPipeline::new().fit(&df).unwrap_err();
        assert!(matches!(err, PipelineError::DataError(_)));
    }

    #[test]
    fn test_refit_is_independent() {
        let df = create_test_dataframe();
        let pipeline = TransformPipeline::new();
        let first = pipeline.fit(&df).unwrap();
        let second = pipeline.fit(&df.slice(0, 3)).unwrap();
        assert_ne!(
            first.scaler().params_for("age"),
            second.scaler().params_for("age")
        );
        assert_eq!(first.schema(), second.schema());
    }
}
