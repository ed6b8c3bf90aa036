//! Alert management handlers.
//!
//! Thin wrappers around [`AlertGateway`](crate::gateway::AlertGateway):
//! extraction here, validation and error mapping in the gateway.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use std::collections::BTreeMap;

use vitrine_alerts::{Alert, AlertMetrics, AlertTypeDescriptor};

use super::common::{created, json_body, ok, ok_list, ok_with_message, CreatedResult, HandlerResult};
use super::ServerState;
use crate::gateway::{
    AcknowledgeRequest, CreateAlertRequest, EscalateRequest, HistoryQuery, ResolveRequest,
    TestAlertRequest,
};

/// `GET /api/alerts`
pub async fn active_alerts_handler(State(state): State<ServerState>) -> HandlerResult<Vec<Alert>> {
    ok_list(state.gateway.active())
}

/// `GET /api/alerts/history?limit=`
pub async fn alert_history_handler(
    State(state): State<ServerState>,
    Query(query): Query<HistoryQuery>,
) -> HandlerResult<Vec<Alert>> {
    ok_list(state.gateway.history(query)?)
}

/// `GET /api/alerts/metrics`
pub async fn alert_metrics_handler(State(state): State<ServerState>) -> HandlerResult<AlertMetrics> {
    ok(state.gateway.metrics())
}

/// `GET /api/alerts/types`
pub async fn alert_types_handler(
    State(state): State<ServerState>,
) -> HandlerResult<BTreeMap<&'static str, AlertTypeDescriptor>> {
    ok(state.gateway.types())
}

/// `GET /api/alerts/:id`
pub async fn get_alert_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> HandlerResult<Alert> {
    ok(state.gateway.get(&id)?)
}

/// `POST /api/alerts`
pub async fn create_alert_handler(
    State(state): State<ServerState>,
    payload: Result<Json<CreateAlertRequest>, JsonRejection>,
) -> CreatedResult<Alert> {
    let alert = state.gateway.create(json_body(payload)?)?;
    created(alert, "Alerte créée avec succès")
}

/// `PUT /api/alerts/:id/acknowledge`
pub async fn acknowledge_alert_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<AcknowledgeRequest>, JsonRejection>,
) -> HandlerResult<Alert> {
    let alert = state.gateway.acknowledge(&id, json_body(payload)?)?;
    ok_with_message(alert, "Alerte acquittée")
}

/// `PUT /api/alerts/:id/resolve`
pub async fn resolve_alert_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> HandlerResult<Alert> {
    let alert = state.gateway.resolve(&id, json_body(payload)?)?;
    ok_with_message(alert, "Alerte résolue")
}

/// `PUT /api/alerts/:id/escalate`
pub async fn escalate_alert_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<EscalateRequest>, JsonRejection>,
) -> HandlerResult<Alert> {
    let alert = state.gateway.escalate(&id, json_body(payload)?)?;
    ok_with_message(alert, "Alerte escaladée")
}

/// `POST /api/alerts/test`
pub async fn create_test_alert_handler(
    State(state): State<ServerState>,
    payload: Result<Json<TestAlertRequest>, JsonRejection>,
) -> CreatedResult<Alert> {
    let alert = state.gateway.create_test(json_body(payload)?)?;
    created(alert, "Alerte de test créée")
}
