//! API-key authentication middleware.
//!
//! Validates the caller-supplied key before a request reaches the sync core.
//! The key is shared per deployment; per-device credentials are a registry
//! concern outside this service.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::IntoResponse,
};
use tracing::warn;

use crate::models::ErrorResponse;
use crate::server::ServerState;

/// Extract the API key from request headers: `X-API-Key` preferred,
/// `Authorization: Bearer` accepted.
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(key.to_string());
    }

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Reject requests without a valid API key. When no key is configured the
/// check is disabled (local development).
pub async fn api_key_auth_middleware(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> axum::response::Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    match extract_api_key(request.headers()) {
        Some(provided) if provided == expected => next.run(request).await,
        Some(_) => {
            warn!(path = %request.uri().path(), "invalid API key");
            ErrorResponse::unauthorized("invalid API key").into_response()
        }
        None => {
            warn!(path = %request.uri().path(), "missing API key");
            ErrorResponse::unauthorized("missing API key").into_response()
        }
    }
}
