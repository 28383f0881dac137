//! Numeric feature scaling

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// No scaling
    None,
}

/// Parameters fitted for one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// mean or min
    pub center: f64,
    /// std or range, never zero
    pub scale: f64,
}

impl ScalerParams {
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }
}

/// Feature scaler. Parameters are stored in fit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    ddof: u8,
    params: Vec<(String, ScalerParams)>,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            ddof: 0,
            params: Vec::new(),
        }
    }

    /// Set the standard deviation degrees of freedom
    pub fn with_ddof(mut self, ddof: u8) -> Self {
        self.ddof = ddof;
        self
    }

    /// Fit the scaler to the given columns. Any previous fit is discarded.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let mut params = Vec::with_capacity(columns.len());
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| PipelineError::FeatureNotFound(col_name.clone()))?;
            let values = Self::as_f64(col_name, column)?;
            params.push((col_name.clone(), self.compute_params(&values)));
        }

        self.params = params;
        Ok(self)
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    /// Fitted parameters in column order
    pub fn params(&self) -> &[(String, ScalerParams)] {
        &self.params
    }

    /// Parameters for a single column
    pub fn params_for(&self, column: &str) -> Option<&ScalerParams> {
        self.params.iter().find(|(name, _)| name == column).map(|(_, p)| p)
    }

    /// Scale the `idx`-th fitted column, reading values from `column`
    pub fn scale_column(&self, idx: usize, column: &Column) -> Result<Vec<f64>> {
        let (name, params) = self.params.get(idx).ok_or_else(|| {
            PipelineError::InvalidInput(format!("scaler has no column at index {}", idx))
        })?;

        let values = Self::as_f64(name, column)?;
        Ok(values.into_no_null_iter().map(|x| params.apply(x)).collect())
    }

    /// Cast a column to f64 and reject nulls, NaN and infinities
    fn as_f64(name: &str, column: &Column) -> Result<Float64Chunked> {
        let casted = column
            .cast(&DataType::Float64)
            .map_err(|e| PipelineError::DataError(e.to_string()))?;
        let ca = casted
            .f64()
            .map_err(|e| PipelineError::DataError(e.to_string()))?
            .clone();

        if ca.null_count() > 0 {
            return Err(PipelineError::DataError(format!(
                "numeric column '{}' contains {} null value(s)",
                name,
                ca.null_count()
            )));
        }

        let non_finite = ca.into_no_null_iter().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            return Err(PipelineError::DataError(format!(
                "numeric column '{}' contains {} NaN or infinite value(s)",
                name, non_finite
            )));
        }

        Ok(ca)
    }

    fn compute_params(&self, ca: &Float64Chunked) -> ScalerParams {
        match self.scaler_type {
            ScalerType::Standard => {
                let mean = ca.mean().unwrap_or(0.0);
                let std = ca.std(self.ddof).unwrap_or(1.0);
                ScalerParams {
                    center: mean,
                    scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
                }
            }
            ScalerType::MinMax => {
                let min = ca.min().unwrap_or(0.0);
                let max = ca.max().unwrap_or(1.0);
                let range = max - min;
                ScalerParams {
                    center: min,
                    scale: if range == 0.0 { 1.0 } else { range },
                }
            }
            ScalerType::None => ScalerParams {
                center: 0.0,
                scale: 1.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap()
    }

    fn scaled(scaler: &Scaler, df: &DataFrame) -> Vec<f64> {
        scaler.scale_column(0, df.column("a").unwrap()).unwrap()
    }

    #[test]
    fn test_standard_scaler() {
        let df = frame();
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&df, &["a".to_string()]).unwrap();

        let out = scaled(&scaler, &df);
        let mean: f64 = out.iter().sum::<f64>() / out.len() as f64;
        assert!(mean.abs() < 1e-10);
        // population std of 1..=5 is sqrt(2)
        let p = scaler.params_for("a").unwrap();
        assert!((p.scale - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn test_sample_std_with_ddof() {
        let df = frame();
        let mut scaler = Scaler::new(ScalerType::Standard).with_ddof(1);
        scaler.fit(&df, &["a".to_string()]).unwrap();
        let p = scaler.params_for("a").unwrap();
        assert!((p.scale - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_minmax_scaler() {
        let df = frame();
        let mut scaler = Scaler::new(ScalerType::MinMax);
        scaler.fit(&df, &["a".to_string()]).unwrap();

        let out = scaled(&scaler, &df);
        assert!((out[0] - 0.0).abs() < 1e-10);
        assert!((out[4] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_constant_column_uses_unit_scale() {
        let df = df!("a" => &[7.0, 7.0, 7.0]).unwrap();
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&df, &["a".to_string()]).unwrap();
        assert_eq!(scaled(&scaler, &df), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_integer_columns_are_cast() {
        let df = df!("a" => &[1i64, 2, 3]).unwrap();
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&df, &["a".to_string()]).unwrap();
        assert_eq!(scaler.params_for("a").unwrap().center, 2.0);
    }

    #[test]
    fn test_nulls_are_rejected() {
        let df = df!("a" => &[Some(1.0), None, Some(3.0)]).unwrap();
        let mut scaler = Scaler::new(ScalerType::Standard);
        let err = scaler.fit(&df, &["a".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::DataError(_)));
    }

    #[test]
    fn test_nan_and_infinity_are_rejected_at_fit() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let df = df!("a" => &[1.0, bad, 3.0, 4.0]).unwrap();
            let mut scaler = Scaler::new(ScalerType::Standard);
            let err = scaler.fit(&df, &["a".to_string()]).unwrap_err();
            assert!(matches!(err, PipelineError::DataError(ref msg) if msg.contains("NaN")));
        }
    }

    #[test]
    fn test_nan_is_rejected_at_transform() {
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&frame(), &["a".to_string()]).unwrap();
        let df = df!("a" => &[f64::NAN]).unwrap();
        assert!(matches!(
            scaler.scale_column(0, df.column("a").unwrap()),
            Err(PipelineError::DataError(_))
        ));
    }

    #[test]
    fn test_training_mean_maps_to_zero_in_new_table() {
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&frame(), &["a".to_string()]).unwrap();
        let new = df!("a" => &[3.0]).unwrap();
        assert_eq!(scaler.scale_column(0, new.column("a").unwrap()).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_unknown_column_index_errors() {
        let df = frame();
        let scaler = Scaler::new(ScalerType::Standard);
        assert!(matches!(
            scaler.scale_column(0, df.column("a").unwrap()),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
