//! Server middleware: per-group rate limiting and request logging.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use lockhub_core::config::rate_limits;

use crate::rate_limit::{RateQuota, extract_client_id};
use crate::server::types::ServerState;

const SYNC_QUOTA: RateQuota =
    RateQuota::new(rate_limits::SYNC_MAX_REQUESTS, rate_limits::WINDOW_SECS);
const ACK_QUOTA: RateQuota = RateQuota::new(rate_limits::ACK_MAX_REQUESTS, rate_limits::WINDOW_SECS);
const COMMAND_QUOTA: RateQuota =
    RateQuota::new(rate_limits::COMMAND_MAX_REQUESTS, rate_limits::WINDOW_SECS);
const READ_QUOTA: RateQuota =
    RateQuota::new(rate_limits::READ_MAX_REQUESTS, rate_limits::WINDOW_SECS);

/// Rate limiting for the sync (bulk upload) group.
pub async fn sync_rate_limit(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit(state, connect_info, request, next, SYNC_QUOTA).await
}

/// Rate limiting for the acknowledgment group.
pub async fn ack_rate_limit(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit(state, connect_info, request, next, ACK_QUOTA).await
}

/// Rate limiting for command issuance and mutation.
pub async fn command_rate_limit(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit(state, connect_info, request, next, COMMAND_QUOTA).await
}

/// Rate limiting for read endpoints.
pub async fn read_rate_limit(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit(state, connect_info, request, next, READ_QUOTA).await
}

async fn rate_limit(
    state: ServerState,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
    quota: RateQuota,
) -> Response {
    if !state.rate_limit_enabled {
        return next.run(request).await;
    }

    let client_id = extract_client_id(request.headers(), connect_info.as_ref());

    match state.rate_limiter.check(&client_id, quota).await {
        Ok(decision) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                "X-RateLimit-Limit",
                HeaderValue::from_str(&decision.limit.to_string())
                    .unwrap_or(HeaderValue::from_static("0")),
            );
            headers.insert(
                "X-RateLimit-Remaining",
                HeaderValue::from_str(&decision.remaining.to_string())
                    .unwrap_or(HeaderValue::from_static("0")),
            );
            response
        }
        Err(e) => {
            // Only log the first rejection in the debounce window.
            if e.should_log() {
                warn!(
                    category = "rate_limit",
                    client = %client_id,
                    wait_seconds = e.wait_seconds,
                    "Rate limit exceeded"
                );
            }
            e.into_response()
        }
    }
}

/// Request logging: assigns a short request id, logs entry and exit, and
/// stamps timing headers on the response.
pub async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let start = Instant::now();
    info!(request_id = %request_id, %method, %path, "request");

    let mut response = next.run(request).await;

    let elapsed = start.elapsed();
    info!(
        request_id = %request_id,
        status = response.status().as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "response"
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert("X-Request-ID", value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.3}", elapsed.as_secs_f64())) {
        headers.insert("X-Process-Time", value);
    }

    response
}
