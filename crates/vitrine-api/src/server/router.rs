//! Application router configuration.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::middleware::error_alert_middleware;
use super::types::{ServerState, MAX_REQUEST_BODY_SIZE};
use crate::config::WsMode;
use crate::handlers::{alerts, basic, ws};
use crate::ws::ChannelKind;

/// Create the application router with a specific state.
pub fn create_router_with_state(state: ServerState) -> Router {
    let api_routes = Router::new()
        .route("/api/health", get(basic::health_handler))
        .route(
            "/api/alerts",
            get(alerts::active_alerts_handler).post(alerts::create_alert_handler),
        )
        .route("/api/alerts/history", get(alerts::alert_history_handler))
        .route("/api/alerts/metrics", get(alerts::alert_metrics_handler))
        .route("/api/alerts/types", get(alerts::alert_types_handler))
        .route("/api/alerts/test", post(alerts::create_test_alert_handler))
        .route("/api/alerts/:id", get(alerts::get_alert_handler))
        .route("/api/alerts/:id/acknowledge", put(alerts::acknowledge_alert_handler))
        .route("/api/alerts/:id/resolve", put(alerts::resolve_alert_handler))
        .route("/api/alerts/:id/escalate", put(alerts::escalate_alert_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            error_alert_middleware,
        ));

    let websocket_routes = match state.config.ws.mode {
        WsMode::Dedicated => {
            Router::new().route(ChannelKind::Alerts.path(), get(ws::alerts_ws_handler))
        }
        // One upgrade path for every channel; the handler picks the channel.
        WsMode::Unified => Router::new().route("/ws/*channel", get(ws::unified_ws_handler)),
    };

    api_routes
        .merge(websocket_routes)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_SIZE))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
