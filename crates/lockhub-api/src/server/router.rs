//! Application router configuration.

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use super::middleware::{
    ack_rate_limit, command_rate_limit, read_rate_limit, request_logging_middleware,
    sync_rate_limit,
};
use super::types::{MAX_REQUEST_BODY_SIZE, ServerState};
use crate::auth::api_key_auth_middleware;

/// Create the application router with a specific state.
pub fn create_router_with_state(state: ServerState) -> Router {
    use crate::handlers::{basic, commands, devices, sync};

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(basic::root_handler))
        .route("/health", get(basic::health_handler));

    // Device sync: the hot path, highest quota
    let sync_routes = Router::new()
        .route("/api/doorlock/bulk-upload", post(sync::bulk_upload_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            sync_rate_limit,
        ));

    let ack_routes = Router::new()
        .route("/api/doorlock/command-ack", post(sync::command_ack_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            ack_rate_limit,
        ));

    // Operator-facing command mutation
    let command_routes = Router::new()
        .route(
            "/api/doorlock/command/unlock-timer",
            post(commands::unlock_timer_handler),
        )
        .route(
            "/api/doorlock/command/rfid-control",
            post(commands::rfid_control_handler),
        )
        .route(
            "/api/doorlock/command/:command_id",
            delete(commands::cancel_command_handler),
        )
        .route(
            "/api/doorlock/commands/retry-failed",
            post(commands::retry_failed_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            command_rate_limit,
        ));

    // Read endpoints
    let read_routes = Router::new()
        .route(
            "/api/doorlock/commands/pending",
            get(commands::pending_commands_handler),
        )
        .route(
            "/api/doorlock/commands/statistics",
            get(commands::command_statistics_handler),
        )
        .route(
            "/api/doorlock/commands/:device_id",
            get(commands::peek_commands_handler),
        )
        .route(
            "/api/doorlock/commands/:device_id/history",
            get(commands::command_history_handler),
        )
        .route(
            "/api/doorlock/command/status/:command_id",
            get(commands::command_status_handler),
        )
        .route("/api/doorlock/status", get(devices::fleet_status_handler))
        .route(
            "/api/doorlock/status/:device_id",
            get(devices::device_status_handler),
        )
        .route(
            "/api/doorlock/logs/:device_id",
            get(devices::access_logs_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            read_rate_limit,
        ));

    // Everything device- or operator-facing requires the API key.
    let protected_routes = sync_routes
        .merge(ack_routes)
        .merge(command_routes)
        .merge(read_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api_key_auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_SIZE))
        .with_state(state)
}
