//! Common API handler utilities.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;

use crate::models::{ApiResponse, ApiResult, ErrorResponse};

/// Result type for all API handlers.
pub type HandlerResult<T> = Result<ApiResponse<T>, ErrorResponse>;

/// Result type for handlers that create a resource (201).
pub type CreatedResult<T> = Result<(StatusCode, ApiResponse<T>), ErrorResponse>;

/// Wrap data in a success response.
pub fn ok<T>(data: T) -> HandlerResult<T> {
    Ok(ApiResponse::success(data))
}

/// Wrap a list in a success response carrying `count`.
pub fn ok_list<T>(data: Vec<T>) -> HandlerResult<Vec<T>> {
    Ok(ApiResponse::list(data))
}

/// Success response with a message.
pub fn ok_with_message<T>(data: T, message: &str) -> HandlerResult<T> {
    Ok(ApiResponse::success(data).with_message(message))
}

/// 201 response with a message.
pub fn created<T>(data: T, message: &str) -> CreatedResult<T> {
    Ok((StatusCode::CREATED, ApiResponse::success(data).with_message(message)))
}

/// Unpack a JSON body. A request without a JSON body reads as the default
/// value so field validation reports what is missing.
pub fn json_body<T: Default>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(e) => Err(ErrorResponse::validation(e.body_text())),
    }
}
