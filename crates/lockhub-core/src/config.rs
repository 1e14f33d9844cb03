//! Configuration defaults and environment variable accessors.
//!
//! Collects every tunable in one place so the other crates never hardcode
//! their own copies of the same constants.

/// Environment variable names.
pub mod env_vars {
    pub const DATABASE_PATH: &str = "LOCKHUB_DATABASE_PATH";
    pub const API_KEY: &str = "LOCKHUB_API_KEY";
    pub const HOST: &str = "LOCKHUB_HOST";
    pub const PORT: &str = "LOCKHUB_PORT";
    pub const RATE_LIMIT_ENABLED: &str = "LOCKHUB_RATE_LIMIT_ENABLED";
}

/// Server defaults.
pub mod server {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8000;
    /// Maximum accepted request body, bytes. Sync batches are small; this
    /// bounds a misbehaving device.
    pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;
}

/// Persistent store defaults.
pub mod storage {
    pub const DEFAULT_DATABASE_PATH: &str = "lockhub.db";
}

/// Rate limit defaults, per identity per window.
///
/// The window is one hour for every route group; the limits mirror how often
/// a healthy device (or operator) has any business calling each group.
pub mod rate_limits {
    pub const WINDOW_SECS: u64 = 3600;
    pub const SYNC_MAX_REQUESTS: u32 = 100;
    pub const ACK_MAX_REQUESTS: u32 = 50;
    pub const COMMAND_MAX_REQUESTS: u32 = 20;
    pub const READ_MAX_REQUESTS: u32 = 30;
    /// How often idle identities are evicted from the limiter.
    pub const CLEANUP_INTERVAL_SECS: u64 = 300;
}

/// Status cache defaults.
pub mod cache {
    /// TTL for a cached device status snapshot.
    pub const DEVICE_STATUS_TTL_SECS: u64 = 3600;
    pub const CLEANUP_INTERVAL_SECS: u64 = 300;
}

/// Command queue defaults.
pub mod commands {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    /// Allowed unlock-timer durations, minutes.
    pub const UNLOCK_DURATIONS_MIN: [u32; 4] = [10, 20, 30, 60];
}

/// Fleet connection classification cutoffs.
pub mod fleet {
    /// A device that synced within this many minutes is online.
    pub const ONLINE_CUTOFF_MIN: i64 = 480;
    /// Between online and this cutoff the device is flagged as a warning.
    pub const WARNING_CUTOFF_MIN: i64 = 1440;
}

/// Read the database path from the environment, or the default.
pub fn database_path() -> String {
    std::env::var(env_vars::DATABASE_PATH)
        .unwrap_or_else(|_| storage::DEFAULT_DATABASE_PATH.to_string())
}

/// Read the API key from the environment. `None` disables the auth check
/// (local development only).
pub fn api_key() -> Option<String> {
    std::env::var(env_vars::API_KEY).ok().filter(|k| !k.is_empty())
}

/// Read the bind host from the environment, or the default.
pub fn host() -> String {
    std::env::var(env_vars::HOST).unwrap_or_else(|_| server::DEFAULT_HOST.to_string())
}

/// Read the bind port from the environment, or the default.
pub fn port() -> u16 {
    std::env::var(env_vars::PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(server::DEFAULT_PORT)
}

/// Whether rate limiting is enabled (default: yes).
pub fn rate_limit_enabled() -> bool {
    std::env::var(env_vars::RATE_LIMIT_ENABLED)
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}
