//! Utility functions and types

pub mod data_loader;

pub use data_loader::{labels_from_column, split_target, DataLoader, DataSaver, DEFAULT_LABEL_COLUMN};
