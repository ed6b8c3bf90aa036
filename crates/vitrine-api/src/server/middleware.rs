//! Server middleware.

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;

use vitrine_alerts::HttpErrorContext;

use super::types::ServerState;
use crate::models::ErrorResponse;

/// Raise an alert for server and authorization failures.
///
/// Handlers fail with an [`ErrorResponse`], which the response carries in
/// its extensions. Statuses >= 500 and 401/403 become alerts; validation
/// and not-found errors do not. In production 5xx messages are redacted,
/// in development they gain a `details` field.
pub async fn error_alert_middleware(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let ip = client_ip(request.headers(), connect_info.as_ref());
    let user_agent = header_str(request.headers(), header::USER_AGENT.as_str());
    let user_id = bearer_token(request.headers())
        .and_then(|token| state.validator.validate(token).ok())
        .map(|claims| claims.user_id);

    let response = next.run(request).await;
    let Some(error) = response.extensions().get::<ErrorResponse>().cloned() else {
        return response;
    };

    let status = error.status;
    if is_alerting(status) {
        tracing::warn!(
            category = "http",
            status = status.as_u16(),
            code = %error.code,
            method = %method,
            path = %path,
            "Request failed"
        );
        state.bridge.report_http_error(&HttpErrorContext {
            status: Some(status.as_u16()),
            error_name: error.code.clone(),
            message: error.message.clone(),
            method: method.clone(),
            path: path.clone(),
            ip,
            user_agent,
            user_id,
        });
    }

    if !status.is_server_error() {
        return response;
    }

    let rewritten = if state.config.environment.is_production() {
        ErrorResponse::new(error.code, "Internal server error", status)
    } else {
        let details = error
            .details
            .clone()
            .unwrap_or_else(|| format!("{} {} failed with {}", method, path, error.code));
        error.with_details(details)
    };
    let (mut parts, _) = response.into_parts();
    let fresh = rewritten.into_response();
    parts.headers = fresh.headers().clone();
    Response::from_parts(parts, fresh.into_body())
}

fn is_alerting(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// First `x-forwarded-for` hop, else the peer address.
fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
