//! Error types for the MLOps pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Stratification error: {0}")]
    StratificationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Corrupt artifact {path}: {reason}")]
    ArtifactCorrupt { path: String, reason: String },

    #[error("Unsupported artifact format version {found} in {path} (supported: {supported})")]
    UnsupportedVersion {
        path: String,
        found: u32,
        supported: u32,
    },

    #[error("Schema mismatch: artifact expects {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PipelineError {
    /// Whether the error was caused by the caller's data or configuration
    /// rather than by the environment (disk, corrupted files).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::SchemaError(_)
                | PipelineError::SchemaMismatch { .. }
                | PipelineError::FeatureNotFound(_)
                | PipelineError::InvalidInput(_)
                | PipelineError::DataError(_)
                | PipelineError::ShapeError { .. }
                | PipelineError::StratificationError(_)
                | PipelineError::ConfigError(_)
        )
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::SchemaError("missing column income".to_string());
        assert_eq!(err.to_string(), "Schema error: missing column income");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::IoError(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_version_error_names_both_versions() {
        let err = PipelineError::UnsupportedVersion {
            path: "preprocessor.bin".to_string(),
            found: 9,
            supported: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains("supported: 1"));
    }
}
