//! Unified error handling for the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for handlers and helpers that fail with an [`ErrorResponse`].
pub type ApiResult<T> = Result<T, ErrorResponse>;

/// API error with its HTTP status code.
///
/// The response carries a copy of the error in its extensions so the
/// error-alert middleware can inspect it after the handler ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code.
    #[serde(skip)]
    pub status: StatusCode,
    /// Internal detail, only sent to clients in development mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Bad request (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message, StatusCode::BAD_REQUEST)
    }

    /// Invalid or missing request field (400).
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message, StatusCode::BAD_REQUEST)
    }

    /// Unauthorized (401).
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message, StatusCode::UNAUTHORIZED)
    }

    /// Not found (404).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message, StatusCode::NOT_FOUND)
    }

    /// Internal server error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// JSON body sent to the client.
    pub fn body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "success": false,
            "error": self.message,
            "code": self.code,
        });
        if let Some(details) = &self.details {
            body["details"] = serde_json::Value::String(details.clone());
        }
        body
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, axum::Json(self.body())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorResponse {}

impl From<anyhow::Error> for ErrorResponse {
    fn from(e: anyhow::Error) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<vitrine_alerts::Error> for ErrorResponse {
    fn from(e: vitrine_alerts::Error) -> Self {
        match e {
            vitrine_alerts::Error::NotFound(message) => Self::not_found(message),
            vitrine_alerts::Error::Validation(message) => Self::validation(message),
            other => Self::internal(other.to_string()),
        }
    }
}
