//! Application state

use crate::preprocessing::FittedTransform;
use crate::training::Predictor;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::ServerConfig;

/// Application state shared across handlers.
///
/// Built once at startup and read-only afterwards, so handlers share it
/// without locks.
pub struct AppState {
    pub config: ServerConfig,
    pub transform: Arc<FittedTransform>,
    pub predictor: Arc<dyn Predictor>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        transform: Arc<FittedTransform>,
        predictor: Arc<dyn Predictor>,
    ) -> Self {
        Self {
            config,
            transform,
            predictor,
            started_at: Utc::now(),
        }
    }
}
