//! MLOps pipeline for loan approval
//!
//! This crate covers the path from a raw applications table to served
//! predictions:
//! - Feature preprocessing with a fit-once, transform-anywhere contract
//! - Stratified train/test preparation and a majority-class baseline
//! - Versioned, checksummed artifacts shared by training and serving
//! - An HTTP inference server, a batch client and a CLI
//!
//! # Modules
//!
//! - [`preprocessing`] - Column classification, scaling, one-hot encoding
//! - [`training`] - Stratified split, dataset preparation, baseline model
//! - [`artifacts`] - Artifact envelope and on-disk store
//! - [`server`] - HTTP server with REST API
//! - [`client`] - Batch request client and prediction summaries
//! - [`cli`] - Command-line interface
//! - [`utils`] - Data loading and saving

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod artifacts;

// Services
pub mod server;
pub mod client;
pub mod cli;

// Utilities
pub mod utils;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PipelineError, Result};

    // Preprocessing
    pub use crate::preprocessing::{
        ColumnSchema, FittedTransform, PreprocessingConfig, Record, ScalerType, TransformPipeline,
    };

    // Training
    pub use crate::training::{
        prepare_dataset, ClassificationMetrics, MajorityClassifier, PrepareConfig,
        PreparedDataset, Predictor, StratifiedSplit,
    };

    // Artifacts
    pub use crate::artifacts::{ArtifactStore, StoredDataset};

    // Data loading
    pub use crate::utils::{DataLoader, DataSaver};
}
