//! Unified error handling for the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use lockhub_commands::CommandError;
use lockhub_devices::DeviceError;
use lockhub_sync::SyncError;

/// Unified API error response with proper HTTP status codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code.
    #[serde(skip)]
    pub status: StatusCode,
    /// Whether retrying the identical request may succeed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[serde(default)]
    pub retryable: bool,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
            retryable: false,
        }
    }

    /// Bad request (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message, StatusCode::BAD_REQUEST)
    }

    /// Unauthorized (401).
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message, StatusCode::UNAUTHORIZED)
    }

    /// Not found (404).
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("{} not found", resource.into()),
            StatusCode::NOT_FOUND,
        )
    }

    /// Conflict (409).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message, StatusCode::CONFLICT)
    }

    /// Validation error (422).
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message, StatusCode::UNPROCESSABLE_ENTITY)
    }

    /// Internal server error (500). The message is generic; details belong
    /// in the server log, not the response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Service unavailable (503), marked retryable.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        let mut err = Self::new(
            "SERVICE_UNAVAILABLE",
            message,
            StatusCode::SERVICE_UNAVAILABLE,
        );
        err.retryable = true;
        err
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": self.code,
                "message": self.message,
                "retryable": self.retryable,
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorResponse {}

/// Conversion from domain error types.

impl From<SyncError> for ErrorResponse {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Validation(msg) => Self::validation(msg),
            SyncError::Device(e) => e.into(),
            SyncError::Command(e) => e.into(),
            SyncError::Storage(e) => {
                tracing::error!(error = %e, "sync failed on storage; rolled back");
                Self::service_unavailable("storage unavailable, retry the sync")
            }
        }
    }
}

impl From<DeviceError> for ErrorResponse {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::NotFound(id) => Self::not_found(format!("device {}", id)),
            DeviceError::Inactive(id) => Self::bad_request(format!("device {} is not active", id)),
            DeviceError::Storage(e) => {
                tracing::error!(error = %e, "device storage error");
                Self::service_unavailable("storage unavailable")
            }
            DeviceError::Corrupt(msg) => {
                tracing::error!(detail = %msg, "corrupt device record");
                Self::internal("internal error")
            }
        }
    }
}

impl From<CommandError> for ErrorResponse {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::NotFound(id) => Self::not_found(format!("command {}", id)),
            CommandError::Conflict { command_id, status } => Self::conflict(format!(
                "command {} is {}; only queued or sent commands allow this",
                command_id, status
            )),
            CommandError::InvalidPayload(msg) => Self::validation(msg),
            CommandError::Storage(e) => {
                tracing::error!(error = %e, "command storage error");
                Self::service_unavailable("storage unavailable")
            }
            CommandError::Corrupt(msg) => {
                tracing::error!(detail = %msg, "corrupt command record");
                Self::internal("internal error")
            }
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ErrorResponse>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_codes() {
        let err = ErrorResponse::not_found("device doorlock_otista_001");
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(!err.retryable);

        let err = ErrorResponse::service_unavailable("store down");
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.retryable);
    }

    #[test]
    fn test_conflict_from_command_error() {
        let err: ErrorResponse = CommandError::Conflict {
            command_id: "cmd_1".to_string(),
            status: lockhub_commands::CommandStatus::Success,
        }
        .into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(err.message.contains("success"));
    }

    #[test]
    fn test_validation_from_sync_error() {
        let err: ErrorResponse = SyncError::Validation("bad battery".to_string()).into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
