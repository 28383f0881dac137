//! Inference server
//!
//! Loads the fitted transform and a model once at startup and serves batch
//! predictions over HTTP. Handlers only ever call `transform`; nothing is
//! re-fitted at serving time.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::PredictResponse;
pub use state::AppState;

use crate::artifacts::ArtifactStore;
use crate::training::{MajorityClassifier, Predictor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Artifact directory holding `preprocessor.bin`
    pub data_dir: String,
    /// Model file, relative to `data_dir` unless absolute
    pub model_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("MLOPS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("MLOPS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            data_dir: std::env::var("MLOPS_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            model_file: std::env::var("MLOPS_MODEL_FILE")
                .unwrap_or_else(|_| "model.json".to_string()),
        }
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<String>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_model_file(mut self, file: impl Into<String>) -> Self {
        self.model_file = file.into();
        self
    }

    /// Resolved model path
    pub fn model_path(&self) -> PathBuf {
        let file = PathBuf::from(&self.model_file);
        if file.is_absolute() {
            file
        } else {
            PathBuf::from(&self.data_dir).join(file)
        }
    }
}

/// Load the transform and model named by `config` into a ready state
pub fn load_state(config: ServerConfig) -> anyhow::Result<AppState> {
    let store = ArtifactStore::new(&config.data_dir);
    let transform = store.load_transform()?;
    let model = MajorityClassifier::load(config.model_path())?;

    if let Some(n) = model.n_features() {
        if n != transform.n_features_out() {
            anyhow::bail!(
                "model expects {} features but the transform produces {}",
                n,
                transform.n_features_out()
            );
        }
    }

    info!(
        data_dir = %config.data_dir,
        model = model.name(),
        n_features = transform.n_features_out(),
        "Loaded serving artifacts"
    );
    Ok(AppState::new(config, Arc::new(transform), Arc::new(model)))
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let state = Arc::new(load_state(config.clone())?);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        address = %addr,
        started_at = %start_time.to_rfc3339(),
        "Inference server starting"
    );
    info!(url = %format!("http://{}/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            return;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path_resolution() {
        let config = ServerConfig::default()
            .with_data_dir("/srv/artifacts")
            .with_model_file("model.json");
        assert_eq!(config.model_path(), PathBuf::from("/srv/artifacts/model.json"));

        let config = config.with_model_file("/opt/model.json");
        assert_eq!(config.model_path(), PathBuf::from("/opt/model.json"));
    }

    #[test]
    fn test_load_state_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::default().with_data_dir(dir.path().to_string_lossy());
        assert!(load_state(config).is_err());
    }
}
