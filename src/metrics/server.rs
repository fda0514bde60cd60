//! HTTP server for the Prometheus endpoint and a scan loop health check.
//!
//! `/health` answers from the last snapshot pushed by the scan thread:
//! 200 while the loop is running with a usable camera, 503 otherwise.

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    /// The server stopped with an error.
    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 9090).into(),
        }
    }
}

impl MetricsServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// Shared state for the metrics server.
pub struct MetricsState {
    registry: MetricsRegistry,
    last: Option<MetricsSnapshot>,
}

impl MetricsState {
    /// Updates the metrics and the health view from a snapshot.
    pub fn update(&mut self, snapshot: &MetricsSnapshot) {
        self.registry.update(snapshot);
        self.last = Some(snapshot.clone());
    }

    /// The most recent snapshot, if any update has arrived.
    pub fn last_snapshot(&self) -> Option<&MetricsSnapshot> {
        self.last.as_ref()
    }

    fn health(&self) -> (StatusCode, String) {
        match &self.last {
            None => (StatusCode::SERVICE_UNAVAILABLE, "state=unknown".to_string()),
            Some(snapshot) => {
                let status = if snapshot.is_healthy() {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                let body = format!(
                    "state={} camera_playing={}",
                    snapshot.state, snapshot.camera_playing
                );
                (status, body)
            }
        }
    }
}

/// HTTP server exposing `/metrics` and `/health`.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: Arc<RwLock<MetricsState>>,
}

impl MetricsServer {
    /// Creates a server. Health reports unavailable until the first update.
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(MetricsState { registry, last: None })),
        }
    }

    /// Returns a handle to the shared state for updating metrics.
    pub fn state(&self) -> Arc<RwLock<MetricsState>> {
        Arc::clone(&self.state)
    }

    /// Runs the server until it is shut down.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(addr = %self.config.bind_addr, "Metrics server listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

async fn metrics_handler(State(state): State<Arc<RwLock<MetricsState>>>) -> impl IntoResponse {
    let state = state.read().await;

    match state.registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

async fn health_handler(State(state): State<Arc<RwLock<MetricsState>>>) -> impl IntoResponse {
    state.read().await.health()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanState;

    fn server() -> MetricsServer {
        MetricsServer::new(
            MetricsServerConfig::default(),
            MetricsRegistry::new().unwrap(),
        )
    }

    fn health_status(state: Arc<RwLock<MetricsState>>) -> StatusCode {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime
            .block_on(health_handler(State(state)))
            .into_response()
            .status()
    }

    #[test]
    fn test_config_default() {
        let config = MetricsServerConfig::default();
        assert_eq!(config.bind_addr.port(), 9090);
    }

    #[test]
    fn test_config_with_port() {
        let config = MetricsServerConfig::with_port(8080);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn test_state_update_visible_through_handle() {
        let state = server().state();
        let mut snapshot = MetricsSnapshot::default();
        snapshot.stats.scans = 4;
        state.blocking_write().update(&snapshot);

        let state = state.blocking_read();
        assert!(state.registry.encode().unwrap().contains("qrscan_scans_total 4"));
        assert_eq!(state.last_snapshot().unwrap().stats.scans, 4);
    }

    #[test]
    fn test_health_unavailable_before_first_update() {
        assert_eq!(health_status(server().state()), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_health_follows_last_snapshot() {
        let state = server().state();
        let mut snapshot = MetricsSnapshot {
            state: ScanState::Sampling,
            camera_playing: true,
            ..Default::default()
        };
        state.blocking_write().update(&snapshot);
        assert_eq!(health_status(Arc::clone(&state)), StatusCode::OK);

        snapshot.camera_playing = false;
        state.blocking_write().update(&snapshot);
        assert_eq!(health_status(Arc::clone(&state)), StatusCode::SERVICE_UNAVAILABLE);

        snapshot.state = ScanState::Idle;
        snapshot.camera_playing = true;
        state.blocking_write().update(&snapshot);
        assert_eq!(health_status(Arc::clone(&state)), StatusCode::SERVICE_UNAVAILABLE);

        snapshot.state = ScanState::Cooldown;
        snapshot.camera_playing = false;
        state.blocking_write().update(&snapshot);
        assert_eq!(health_status(state), StatusCode::OK);
    }

    #[test]
    fn test_health_body_names_state() {
        let state = MetricsState {
            registry: MetricsRegistry::new().unwrap(),
            last: Some(MetricsSnapshot::default()),
        };
        let (status, body) = state.health();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "state=idle camera_playing=false");
    }
}
