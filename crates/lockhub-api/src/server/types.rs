//! Shared server state.

use lockhub_commands::CommandQueue;
use lockhub_devices::{DeviceRegistry, StatusCache};
use lockhub_storage::Database;
use lockhub_sync::SyncCoordinator;

use crate::rate_limit::RateLimiter;

pub use lockhub_core::config::server::MAX_REQUEST_BODY_SIZE;

/// Application state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct ServerState {
    pub db: Database,
    pub registry: DeviceRegistry,
    pub queue: CommandQueue,
    pub coordinator: SyncCoordinator,
    pub status_cache: StatusCache,
    pub rate_limiter: RateLimiter,
    pub rate_limit_enabled: bool,
    /// Shared deployment key; `None` disables the auth check.
    pub api_key: Option<String>,
}

impl ServerState {
    /// Wire the component graph over an opened database.
    pub fn new(db: Database, api_key: Option<String>) -> Self {
        let registry = DeviceRegistry::new(db.clone());
        let queue = CommandQueue::new(db.clone());
        let status_cache = StatusCache::with_default_ttl();
        let coordinator = SyncCoordinator::new(
            db.clone(),
            registry.clone(),
            queue.clone(),
            status_cache.clone(),
        );

        Self {
            db,
            registry,
            queue,
            coordinator,
            status_cache,
            rate_limiter: RateLimiter::new(),
            rate_limit_enabled: lockhub_core::config::rate_limit_enabled(),
            api_key,
        }
    }

    /// Disable rate limiting (tests).
    pub fn without_rate_limits(mut self) -> Self {
        self.rate_limit_enabled = false;
        self
    }
}
