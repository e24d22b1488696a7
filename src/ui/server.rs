//! Axum HTTP server

use axum::{http::Method, routing::get, Router};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::UiConfig;
use crate::error::NetworkError;
use crate::runtime::SharedStatus;
use crate::ui::handlers;

/// Application state shared across all requests
pub struct AppState {
    pub status: SharedStatus,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(status: SharedStatus) -> Self {
        Self {
            status,
            started_at: Utc::now(),
        }
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/api/status", get(handlers::get_status))
        .route("/api/routes", get(handlers::get_routes))
        .route("/api/universes", get(handlers::get_universes))
        .route("/api/universes/:id", get(handlers::get_universe))
        .route("/api/channels", get(handlers::get_channels))
        .layer(cors)
        .with_state(state)
}

/// HTTP server for the status API
pub struct WebServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server
    pub fn new(config: &UiConfig, status: SharedStatus) -> Self {
        Self {
            addr: SocketAddr::new(config.bind_address, config.http_port),
            state: Arc::new(AppState::new(status)),
        }
    }

    /// Serve until the listener fails
    pub async fn run(self) -> Result<(), NetworkError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| NetworkError::BindFailed(format!("{}: {}", self.addr, e)))?;

        tracing::info!("Status API listening on http://{}", self.addr);

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| NetworkError::ReceiveFailed(format!("HTTP server error: {}", e)))
    }

    /// Spawn the server on the current runtime
    pub fn start_background(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                tracing::error!("Status API stopped: {}", e);
            }
        })
    }
}
