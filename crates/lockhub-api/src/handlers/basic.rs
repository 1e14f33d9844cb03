//! Health and root endpoints.

use axum::extract::State;
use chrono::Utc;
use serde_json::json;

use super::common::{HandlerResult, ok};
use crate::server::ServerState;

/// Root endpoint with API information.
///
/// GET /
pub async fn root_handler() -> HandlerResult<serde_json::Value> {
    ok(json!({
        "message": "LockHub API Server",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
        "status": "running",
    }))
}

/// Liveness probe for container orchestration. Reports store connectivity
/// without failing the endpoint when the store is down.
///
/// GET /health
pub async fn health_handler(State(state): State<ServerState>) -> HandlerResult<serde_json::Value> {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };
    let cache_stats = state.status_cache.stats().await;

    ok(json!({
        "status": if database == "connected" { "healthy" } else { "degraded" },
        "service": "lockhub-backend",
        "database": database,
        "cache": cache_stats,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
