//! Best-effort TTL cache of last-known device status.
//!
//! Purely advisory: the status read path treats every miss, expiry, or
//! failure as "go to the store". Nothing here is a system of record and
//! losing the whole map on restart is fine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;

use lockhub_core::DeviceId;
use lockhub_core::config::cache;

use crate::device::DeviceStatus;

/// Cache entry with expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    status: DeviceStatus,
    /// Expiration unix timestamp
    expires_at: i64,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() > self.expires_at
    }
}

/// In-memory device status cache.
pub struct StatusCache {
    entries: Arc<RwLock<HashMap<DeviceId, CacheEntry>>>,
    default_ttl: Duration,
}

impl StatusCache {
    /// Create a cache with a custom default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Create a cache with the configured device-status TTL.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(cache::DEVICE_STATUS_TTL_SECS))
    }

    /// Get a cached status if present and not expired.
    pub async fn get(&self, device_id: &str) -> Option<DeviceStatus> {
        let entries = self.entries.read().await;
        entries.get(device_id).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.status.clone())
            }
        })
    }

    /// Store a status snapshot.
    pub async fn put(&self, status: DeviceStatus, ttl: Option<Duration>) {
        let expires_at =
            chrono::Utc::now().timestamp() + ttl.unwrap_or(self.default_ttl).as_secs() as i64;

        let entry = CacheEntry { status, expires_at };

        let mut entries = self.entries.write().await;
        entries.insert(entry.status.device_id.clone(), entry);
    }

    /// Drop one device's entry.
    pub async fn invalidate(&self, device_id: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(device_id);
    }

    /// Drop everything.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Evict expired entries.
    pub async fn cleanup(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired());
    }

    /// Cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let now = chrono::Utc::now().timestamp();
        let active = entries.values().filter(|e| e.expires_at > now).count();

        CacheStats {
            total_entries: entries.len(),
            active_entries: active,
            expired_entries: entries.len() - active,
        }
    }
}

impl Clone for StatusCache {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            default_ttl: self.default_ttl,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
}

/// Background task that periodically evicts expired entries.
pub async fn cleanup_task(cache: StatusCache, interval: Duration) {
    let mut interval_timer = tokio::time::interval(interval);
    loop {
        interval_timer.tick().await;
        cache.cleanup().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DoorState, StatusSnapshot};
    use chrono::Utc;

    fn status(device_id: &str) -> DeviceStatus {
        DeviceStatus {
            device_id: device_id.to_string(),
            snapshot: StatusSnapshot {
                door_status: DoorState::Locked,
                rfid_enabled: true,
                battery_percentage: 90,
                uptime_seconds: 100,
                wifi_rssi: -55,
                free_heap: 30000,
            },
            last_sync: Utc::now(),
            session_id: "s1".to_string(),
            location: "otista".to_string(),
            spam_detected: false,
            total_access_count: 3,
        }
    }

    #[tokio::test]
    async fn test_put_get() {
        let cache = StatusCache::with_default_ttl();

        cache.put(status("doorlock_otista_001"), None).await;

        let cached = cache.get("doorlock_otista_001").await;
        assert!(cached.is_some());
        assert_eq!(cached.unwrap().device_id, "doorlock_otista_001");

        assert!(cache.get("doorlock_otista_002").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = StatusCache::with_default_ttl();

        cache
            .put(status("doorlock_otista_001"), Some(Duration::from_secs(0)))
            .await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.get("doorlock_otista_001").await.is_none());

        cache.cleanup().await;
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn test_put_replaces_previous_entry() {
        let cache = StatusCache::with_default_ttl();

        cache.put(status("doorlock_otista_001"), None).await;

        let mut updated = status("doorlock_otista_001");
        updated.snapshot.battery_percentage = 12;
        cache.put(updated, None).await;

        let cached = cache.get("doorlock_otista_001").await.unwrap();
        assert_eq!(cached.snapshot.battery_percentage, 12);
        assert_eq!(cache.stats().await.total_entries, 1);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = StatusCache::with_default_ttl();

        cache.put(status("doorlock_otista_001"), None).await;
        cache.invalidate("doorlock_otista_001").await;

        assert!(cache.get("doorlock_otista_001").await.is_none());
    }
}
