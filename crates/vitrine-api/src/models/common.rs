//! Success response envelope.

use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

/// Success envelope shared by every alert endpoint.
///
/// ```json
/// { "success": true, "data": [...], "count": 2 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    pub data: T,

    /// Number of items, for list responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Human-readable outcome, for mutations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// Create a list response; `count` is the list length.
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            success: true,
            data,
            count: Some(count),
            message: None,
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        axum::Json(self).into_response()
    }
}
