//! Preprocessing configuration

use serde::{Deserialize, Serialize};
use super::ScalerType;

/// Configuration for the transform pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Type of scaler to use for numeric features
    pub scaler_type: ScalerType,

    /// Delta degrees of freedom for the standard deviation.
    /// 0 gives the population deviation used by StandardScaler.
    pub ddof: u8,

    /// Columns to leave out of the transform entirely (e.g. identifiers)
    pub exclude_columns: Vec<String>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            scaler_type: ScalerType::Standard,
            ddof: 0,
            exclude_columns: Vec::new(),
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set scaler type
    pub fn with_scaler(mut self, scaler_type: ScalerType) -> Self {
        self.scaler_type = scaler_type;
        self
    }

    /// Builder method to set the standard deviation degrees of freedom
    pub fn with_ddof(mut self, ddof: u8) -> Self {
        self.ddof = ddof;
        self
    }

    /// Builder method to exclude a column from classification
    pub fn exclude(mut self, column: impl Into<String>) -> Self {
        self.exclude_columns.push(column.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreprocessingConfig::default();
        assert_eq!(config.scaler_type, ScalerType::Standard);
        assert_eq!(config.ddof, 0);
        assert!(config.exclude_columns.is_empty());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PreprocessingConfig::new()
            .with_scaler(ScalerType::MinMax)
            .with_ddof(1)
            .exclude("customer_id");

        assert_eq!(config.scaler_type, ScalerType::MinMax);
        assert_eq!(config.ddof, 1);
        assert_eq!(config.exclude_columns, vec!["customer_id".to_string()]);
    }
}
