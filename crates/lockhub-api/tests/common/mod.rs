//! Common test utilities for API tests.

use lockhub_api::ServerState;
use lockhub_storage::Database;

/// Create a server state over an in-memory store, with auth and rate
/// limiting disabled.
pub async fn create_test_server_state() -> ServerState {
    let db = Database::open_in_memory().await.unwrap();
    ServerState::new(db, None).without_rate_limits()
}

/// A valid sync request for the given device and session, with one access
/// log buffered an hour ago.
pub fn sync_request(device_id: &str, session_id: &str) -> lockhub_sync::SyncRequest {
    let now = chrono::Utc::now();
    let hour_ago = now - chrono::Duration::hours(1);
    let eight_hours_ago = now - chrono::Duration::hours(8);

    serde_json::from_value(serde_json::json!({
        "doorlock": {
            "device_id": device_id,
            "location": "otista",
            "sync_session": {
                "session_id": session_id,
                "period": {"from": eight_hours_ago.to_rfc3339(), "to": now.to_rfc3339()}
            },
            "current_status": {
                "door_status": "locked",
                "rfid_enabled": true,
                "battery_percentage": 87,
                "uptime_seconds": 28800,
                "wifi_rssi": -61,
                "free_heap": 28000
            },
            "access_logs": [
                {"card_uid": "04a1b2c3", "access_granted": true, "timestamp": hour_ago.to_rfc3339()}
            ],
            "spam_detected": false,
            "total_access_count": 128,
            "timestamp": now.to_rfc3339()
        }
    }))
    .unwrap()
}
