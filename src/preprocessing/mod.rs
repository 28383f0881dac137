//! Feature preprocessing
//!
//! Fit/transform contract shared by training and serving:
//! - Column classification (numeric vs categorical) from declared dtypes
//! - Numeric scaling (StandardScaler, MinMaxScaler)
//! - One-hot encoding with unseen-category tolerance
//! - An immutable [`FittedTransform`] that produces dense matrices

mod config;
mod encoder;
mod pipeline;
mod scaler;
mod schema;
mod transform;

pub use config::PreprocessingConfig;
pub use encoder::Encoder;
pub use pipeline::TransformPipeline;
pub use scaler::{Scaler, ScalerParams, ScalerType};
pub use schema::{is_numeric_dtype, ColumnSchema};
pub use transform::{FittedTransform, Record};

use serde::{Deserialize, Serialize};

/// Column kind assigned at fit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Categorical => write!(f, "categorical"),
        }
    }
}
