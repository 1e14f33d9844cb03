//! HTTP surface for the LockHub backend.
//!
//! Axum router plus the middleware stack: API-key authentication,
//! sliding-window rate limiting per route group, and request logging.

pub mod auth;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod server;

pub use models::{ApiResult, ErrorResponse};
pub use rate_limit::{RateDecision, RateLimiter, RateQuota};
pub use server::{ServerState, create_router_with_state, run};
