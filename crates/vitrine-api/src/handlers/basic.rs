//! Basic handlers - health check.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ServerState;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime: u64,
    pub active_alerts: usize,
    pub ws_connections: usize,
}

/// `GET /api/health`
pub async fn health_handler(State(state): State<ServerState>) -> Json<HealthStatus> {
    let uptime = chrono::Utc::now().timestamp() - state.started_at;

    Json(HealthStatus {
        status: "ok",
        service: "vitrine",
        version: env!("CARGO_PKG_VERSION"),
        uptime: uptime.max(0) as u64,
        active_alerts: state.registry.active_alerts().len(),
        ws_connections: state.hub.connection_count(),
    })
}
