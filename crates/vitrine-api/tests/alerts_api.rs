//! HTTP tests for the alert endpoints and the error-alert middleware.

mod common;

use axum::http::{Method, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;

use vitrine_alerts::{Alert, AlertPriority, AlertType, MemoryChannel};
use vitrine_api::config::{Environment, WsMode};
use vitrine_api::server::error_alert_middleware;
use vitrine_api::{ErrorResponse, ServerState};

use common::{create_test_server_state, create_test_server_state_in, send, test_router};

fn client_fields(alert: &Value) -> Value {
    json!({
        "type": alert["type"],
        "title": alert["title"],
        "message": alert["message"],
        "priority": alert["priority"],
        "source": alert["source"],
        "data": alert["data"],
        "userId": alert["userId"],
    })
}

#[tokio::test]
async fn test_created_alert_round_trips_through_get_and_history() {
    let state = create_test_server_state(WsMode::Unified);
    let router = test_router(&state);

    let (status, body) = send(
        router.clone(),
        Method::POST,
        "/api/alerts",
        Some(json!({
            "type": "INVENTORY",
            "title": "Stock faible",
            "message": "SKU-42 sous le seuil",
            "priority": "low",
            "source": "stock_service",
            "data": {"sku": "SKU-42", "remaining": 3},
            "userId": "u1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["message"].is_string());
    let created = body["data"].clone();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "active");
    assert_eq!(created["history"].as_array().unwrap().len(), 1);

    let (status, fetched) = send(router.clone(), Method::GET, &format!("/api/alerts/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(client_fields(&fetched["data"]), client_fields(&created));
    let typed: Alert = serde_json::from_value(fetched["data"].clone()).unwrap();
    assert_eq!(typed.alert_type, AlertType::Inventory);

    let (status, _) = send(
        router.clone(),
        Method::PUT,
        &format!("/api/alerts/{}/resolve", id),
        Some(json!({"userId": "u2", "resolution": "Réassort commandé"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, history) = send(router.clone(), Method::GET, "/api/alerts/history", None).await;
    let entry = history["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["id"] == id.as_str())
        .cloned()
        .unwrap();
    assert_eq!(client_fields(&entry), client_fields(&created));
    assert_eq!(entry["status"], "resolved");

    let (_, active) = send(router, Method::GET, "/api/alerts", None).await;
    assert_eq!(active["count"], 0);
}

#[tokio::test]
async fn test_bogus_type_lists_valid_types() {
    let state = create_test_server_state(WsMode::Unified);
    let (status, body) = send(
        test_router(&state),
        Method::POST,
        "/api/alerts",
        Some(json!({"type": "BOGUS", "title": "t", "message": "m"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let error = body["error"].as_str().unwrap();
    for alert_type in AlertType::ALL {
        assert!(error.contains(alert_type.as_str()), "{} missing from {}", alert_type, error);
    }
    assert_eq!(state.registry.metrics().total, 0);
}

#[tokio::test]
async fn test_validation_and_not_found_mapping() {
    let state = create_test_server_state(WsMode::Unified);
    let router = test_router(&state);

    let (status, _) = send(router.clone(), Method::POST, "/api/alerts", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(router.clone(), Method::GET, "/api/alerts/history?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(router.clone(), Method::POST, "/api/alerts/test", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["type"], "SYSTEM");

    let (status, _) = send(
        router.clone(),
        Method::PUT,
        &format!("/api/alerts/{}/acknowledge", id),
        Some(json!({"comment": "vu"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        router.clone(),
        Method::PUT,
        "/api/alerts/alert_999_0/acknowledge",
        Some(json!({"userId": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(router.clone(), Method::GET, "/api/alerts/alert_999_0", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(
        router.clone(),
        Method::PUT,
        &format!("/api/alerts/{}/escalate", id),
        Some(json!({"reason": "Pas de réponse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["escalationReason"], "Pas de réponse");

    // 4xx responses never raise alerts: only the test alert exists.
    assert_eq!(state.registry.metrics().total, 1);
    state.registry.shutdown();
}

#[tokio::test]
async fn test_reads() {
    let state = create_test_server_state(WsMode::Unified);
    let router = test_router(&state);

    let (status, types) = send(router.clone(), Method::GET, "/api/alerts/types", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(types["data"].as_object().unwrap().len(), 8);
    assert_eq!(types["data"]["SYSTEM"]["escalationDelayMs"], 600000);

    send(
        router.clone(),
        Method::POST,
        "/api/alerts",
        Some(json!({"type": "BUSINESS", "title": "t", "message": "m"})),
    )
    .await;
    let (_, metrics) = send(router.clone(), Method::GET, "/api/alerts/metrics", None).await;
    assert_eq!(metrics["data"]["total"], 1);
    assert_eq!(metrics["data"]["active"], 1);

    let (status, health) = send(router, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["activeAlerts"], 1);
}

#[tokio::test]
async fn test_urgent_alert_reaches_notification_channels() {
    let state = create_test_server_state(WsMode::Unified);
    let inbox = MemoryChannel::new("inbox".to_string());
    state.registry.add_notification_channel(Arc::new(inbox.clone()));
    assert_eq!(
        state.registry.notification_channels(),
        vec!["console".to_string(), "inbox".to_string()]
    );
    let router = test_router(&state);

    for priority in ["medium", "critical"] {
        let (status, _) = send(
            router.clone(),
            Method::POST,
            "/api/alerts",
            Some(json!({"type": "SECURITY", "title": "Intrusion", "message": "Badge refusé", "priority": priority})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    for _ in 0..100 {
        if inbox.count().await > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let delivered = inbox.get_alerts().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].priority, AlertPriority::Critical);
    state.registry.shutdown();
}

fn failing_router(state: &ServerState) -> Router {
    Router::new()
        .route("/boom", get(|| async { ErrorResponse::internal("connection pool exhausted") }))
        .route("/denied", get(|| async { ErrorResponse::unauthorized("Token invalide") }))
        .route(
            "/db",
            get(|| async {
                ErrorResponse::new("DATABASE_ERROR", "deadlock detected", StatusCode::INTERNAL_SERVER_ERROR)
            }),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            error_alert_middleware,
        ))
        .with_state(state.clone())
}

#[tokio::test]
async fn test_server_errors_raise_alerts() {
    let state = create_test_server_state(WsMode::Unified);
    let (status, body) = send(failing_router(&state), Method::GET, "/boom", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "connection pool exhausted");
    assert!(body["details"].is_string());

    let alerts = state.registry.active_alerts();
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.alert_type, AlertType::System);
    assert_eq!(alert.source, "error_handler");
    assert_eq!(alert.data["path"], "/boom");
    assert_eq!(alert.data["method"], "GET");
    assert_eq!(alert.data["statusCode"], 500);
    state.registry.shutdown();
}

#[tokio::test]
async fn test_error_code_drives_alert_priority() {
    let state = create_test_server_state(WsMode::Unified);
    let router = failing_router(&state);

    let (status, body) = send(router.clone(), Method::GET, "/db", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DATABASE_ERROR");
    send(router, Method::GET, "/boom", None).await;

    let alerts = state.registry.active_alerts();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].priority, AlertPriority::Critical);
    assert_eq!(alerts[0].data["errorName"], "DATABASE_ERROR");
    assert_eq!(alerts[1].priority, AlertPriority::High);
    state.registry.shutdown();
}

#[tokio::test]
async fn test_production_redacts_server_errors() {
    let state = create_test_server_state_in(WsMode::Unified, Environment::Production);
    let (status, body) = send(failing_router(&state), Method::GET, "/boom", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(body.get("details").is_none());

    let alert = &state.registry.active_alerts()[0];
    assert_eq!(alert.message, "connection pool exhausted");
    state.registry.shutdown();
}

#[tokio::test]
async fn test_unauthorized_raises_security_alert() {
    let state = create_test_server_state(WsMode::Unified);
    let (status, body) = send(failing_router(&state), Method::GET, "/denied", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token invalide");

    let alert = &state.registry.active_alerts()[0];
    assert_eq!(alert.alert_type, AlertType::Security);
    state.registry.shutdown();
}
