//! HTTP request handlers

use crate::preprocessing::Record;
use ndarray::Array1;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::error::{Result, ServerError};
use super::state::AppState;

/// Body returned by `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<i64>,
    pub total_records: usize,
    pub timestamp: String,
}

pub async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Loan approval inference service. POST records to /predict.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.predictor.name(),
        "n_features": state.transform.n_features_out(),
        "input_columns": state.transform.input_columns(),
        "uptime_secs": chrono::Utc::now().signed_duration_since(state.started_at).num_seconds(),
    }))
}

/// Transform a batch of records with the loaded transform and predict
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let start = Instant::now();

    let Json(body) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let records: Vec<Record> = serde_json::from_value(body).map_err(|e| {
        ServerError::BadRequest(format!("expected a JSON array of records: {}", e))
    })?;
    if records.is_empty() {
        return Err(ServerError::BadRequest("no records to predict".to_string()));
    }
    let n_records = records.len();

    // Frame building and prediction are CPU-bound
    let transform = Arc::clone(&state.transform);
    let predictor = Arc::clone(&state.predictor);
    let predictions = tokio::task::spawn_blocking(move || -> crate::error::Result<Array1<i64>> {
        let x = transform.transform_records(&records)?;
        predictor.predict(&x)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("prediction task failed: {}", e)))??;

    if predictions.len() != n_records {
        return Err(ServerError::Internal(format!(
            "{} returned {} predictions for {} records",
            state.predictor.name(),
            predictions.len(),
            n_records
        )));
    }

    info!(
        records = n_records,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Served predictions"
    );

    Ok(Json(PredictResponse {
        total_records: n_records,
        predictions: predictions.to_vec(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
