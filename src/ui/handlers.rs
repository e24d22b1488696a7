//! HTTP API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::node::{ChannelStatus, NodeStats, UniverseStatus};
use crate::routing::{NodeAddress, Route};
use crate::scheduler::OutputStatus;
use crate::ui::server::AppState;

/// API response wrapper
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// System status
#[derive(serde::Serialize)]
pub struct SystemStatus {
    pub node: NodeAddress,
    pub output: OutputStatus,
    pub route_count: usize,
    pub universe_count: usize,
    pub stats: NodeStats,
    pub uptime_seconds: u64,
    pub updated_at: DateTime<Utc>,
}

/// Get system status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SystemStatus>> {
    let snapshot = state.status.read();
    let uptime = Utc::now().signed_duration_since(state.started_at);

    let status = SystemStatus {
        node: snapshot.node,
        output: snapshot.output.clone(),
        route_count: snapshot.routes.len(),
        universe_count: snapshot.universes.len(),
        stats: snapshot.stats.clone(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        updated_at: snapshot.updated_at,
    };

    Json(ApiResponse::ok(status))
}

/// Get all routes, disabled ones included
pub async fn get_routes(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<Route>>> {
    Json(ApiResponse::ok(state.status.read().routes.clone()))
}

/// Get every universe buffer
pub async fn get_universes(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<UniverseStatus>>> {
    Json(ApiResponse::ok(state.status.read().universes.clone()))
}

/// Get one universe buffer
pub async fn get_universe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u8>,
) -> (StatusCode, Json<ApiResponse<UniverseStatus>>) {
    let snapshot = state.status.read();

    match snapshot.universes.iter().find(|u| u.universe == id) {
        Some(universe) => (StatusCode::OK, Json(ApiResponse::ok(universe.clone()))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Universe {} not found", id))),
        ),
    }
}

/// Get bound output and sensor channels
pub async fn get_channels(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<ChannelStatus>>> {
    Json(ApiResponse::ok(state.status.read().channels.clone()))
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::dmx::BusSet;
    use crate::network::MemoryTransport;
    use crate::node::Node;
    use crate::runtime::shared_status;
    use crate::ui::server::{router, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let config = AppConfig::from_toml_str(
            r#"
            [[routes]]
            bus = 1
            universe = 2
            direction = "to_dmx"

            [[channels]]
            name = "dimmer"
            universe = 2
            channel = 1
            role = "output"
            "#,
        )
        .unwrap();
        let mut node = Node::new(&config, MemoryTransport::new(), BusSet::new()).unwrap();
        node.write_output("dimmer", 1.0).unwrap();

        router(Arc::new(AppState::new(shared_status(&node))))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_status() {
        let (status, json) = get_json("/api/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["route_count"], 1);
        assert_eq!(json["data"]["universe_count"], 1);
    }

    #[tokio::test]
    async fn test_routes() {
        let (_, json) = get_json("/api/routes").await;

        assert_eq!(json["data"][0]["bus"], 1);
        assert_eq!(json["data"][0]["direction"], "to_dmx");
    }

    #[tokio::test]
    async fn test_universe_lookup() {
        let (status, json) = get_json("/api/universes/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["state"], "dirty");
        assert_eq!(json["data"]["data"][0], 255);

        let (status, json) = get_json("/api/universes/9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_channels() {
        let (_, json) = get_json("/api/channels").await;

        assert_eq!(json["data"][0]["name"], "dimmer");
        assert_eq!(json["data"][0]["value"], 255);
        assert_eq!(json["data"][0]["role"], "output");
    }
}
