//! Shared handler helpers.

use axum::Json;

use crate::models::ErrorResponse;

/// Result type for handlers returning JSON.
pub type HandlerResult<T> = Result<Json<T>, ErrorResponse>;

/// Wrap a value in a JSON success response.
pub fn ok<T>(value: T) -> HandlerResult<T> {
    Ok(Json(value))
}
