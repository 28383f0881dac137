//! Dataset preparation and baseline training
//!
//! - Stratified, seeded train/test split
//! - Split-and-fit orchestration over the preprocessing pipeline
//! - Majority-class baseline and classification metrics
//! - Per-model results table for reporting

mod baseline;
mod models;
mod prepare;
mod results;
pub mod split;

pub use baseline::MajorityClassifier;
pub use models::{ClassificationMetrics, Predictor};
pub use prepare::{prepare_dataset, PrepareConfig, PreparedDataset};
pub use results::{ModelResult, ModelResults, RESULTS_FILE};
pub use split::{class_counts, SplitPartition, StratifiedSplit};
