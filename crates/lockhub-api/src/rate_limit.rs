//! Simple in-memory rate limiting.
//!
//! Sliding window per caller identity: each check prunes request timestamps
//! older than the window, counts what remains, and either records the new
//! request or rejects with the wait time. Nothing is persisted; a restart
//! resets quotas early, which is the accepted trade-off.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::ConnectInfo,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;

/// Per-route-group quota.
#[derive(Debug, Clone, Copy)]
pub struct RateQuota {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateQuota {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Outcome of an allowed check, for response headers.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub limit: u32,
    pub remaining: u32,
}

/// Rate limiter state.
#[derive(Clone)]
pub struct RateLimiter {
    /// Map of client identifier -> request history
    clients: Arc<RwLock<HashMap<String, ClientState>>>,
    /// Minimum duration between warning logs for the same client
    warn_interval: Duration,
}

/// State for a single client.
struct ClientState {
    /// Request timestamps
    history: Vec<Instant>,
    /// Last time a warning was logged for this client
    last_warning: Option<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            warn_interval: Duration::from_secs(5),
        }
    }

    /// Check whether a request from `identity` fits the quota, recording it
    /// if so.
    pub async fn check(
        &self,
        identity: &str,
        quota: RateQuota,
    ) -> Result<RateDecision, RateLimitExceeded> {
        let mut clients = self.clients.write().await;
        let now = Instant::now();
        let window_start = now - quota.window;

        let state = clients
            .entry(identity.to_string())
            .or_insert_with(|| ClientState {
                history: Vec::new(),
                last_warning: None,
            });

        // Remove requests outside the time window.
        state.history.retain(|&timestamp| timestamp > window_start);

        if state.history.len() >= quota.max_requests as usize {
            let wait_time = state
                .history
                .first()
                .map(|&oldest| quota.window.saturating_sub(now - oldest))
                .unwrap_or(quota.window);

            // Debounce the warning log per client.
            let should_log = match state.last_warning {
                Some(last_warning) => {
                    now.saturating_duration_since(last_warning) >= self.warn_interval
                }
                None => true,
            };
            if should_log {
                state.last_warning = Some(now);
            }

            return Err(RateLimitExceeded {
                limit: quota.max_requests,
                wait_seconds: wait_time.as_secs(),
                should_log,
            });
        }

        state.history.push(now);
        state.last_warning = None;

        Ok(RateDecision {
            limit: quota.max_requests,
            remaining: quota.max_requests - state.history.len() as u32,
        })
    }

    /// Drop identities whose whole history has aged past `max_window`.
    pub async fn cleanup_old_entries(&self, max_window: Duration) {
        let mut clients = self.clients.write().await;
        let now = Instant::now();
        let window_start = now - max_window;

        clients.retain(|_key, state| {
            state.history.retain(|&timestamp| timestamp > window_start);
            !state.history.is_empty()
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limit exceeded error.
#[derive(Debug)]
pub struct RateLimitExceeded {
    pub limit: u32,
    pub wait_seconds: u64,
    /// Whether this rejection should trigger a warning log (debounced)
    should_log: bool,
}

impl RateLimitExceeded {
    pub fn should_log(&self) -> bool {
        self.should_log
    }
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": "Rate limit exceeded",
            "retry_after": self.wait_seconds,
        });
        (
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            [
                ("Retry-After", self.wait_seconds.to_string()),
                ("X-RateLimit-Limit", self.limit.to_string()),
                ("X-RateLimit-Remaining", "0".to_string()),
            ],
            axum::Json(body),
        )
            .into_response()
    }
}

/// Extract client identifier from a request.
/// Uses the API key when present, otherwise the peer IP address.
pub fn extract_client_id(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> String {
    // Hash the API key so identities never leak into logs.
    if let Some(api_key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return format!("apikey:{:x}", hash_string(api_key));
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return format!("apikey:{:x}", hash_string(token));
        }
    }

    if let Some(info) = connect_info {
        return format!("ip:{}", info.0.ip());
    }

    // Behind a proxy without ConnectInfo, fall back to header fingerprints.
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    format!("fallback:{:x}", hash_string(user_agent))
}

/// Simple hash for anonymizing sensitive data.
fn hash_string(s: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Background task to periodically clean up old rate limit entries.
pub async fn cleanup_task(limiter: RateLimiter, max_window: Duration, interval: Duration) {
    let mut interval_timer = tokio::time::interval(interval);
    loop {
        interval_timer.tick().await;
        limiter.cleanup_old_entries(max_window).await;
    }
}
