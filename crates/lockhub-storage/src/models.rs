//! Row types returned by the query modules.
//!
//! These are storage-layer shapes: statuses and payloads stay as stored
//! (TEXT), timestamps are unix seconds. The domain crates convert them into
//! richer types at their own boundary.

use sqlx::FromRow;

/// A device record.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceRow {
    pub device_id: String,
    pub device_name: String,
    pub location: String,
    pub is_active: bool,
    pub created_at: i64,
    pub last_seen: Option<i64>,
}

/// The single status row kept per device, replaced wholesale on every sync.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceStatusRow {
    pub device_id: String,
    pub door_status: String,
    pub rfid_enabled: bool,
    pub battery_percentage: i64,
    pub uptime_seconds: i64,
    pub wifi_rssi: i64,
    pub free_heap: i64,
    pub last_sync: i64,
    pub session_id: String,
    pub location: String,
    pub spam_detected: bool,
    pub total_access_count: i64,
    pub updated_at: i64,
}

/// Values for a wholesale status upsert.
#[derive(Debug, Clone)]
pub struct NewDeviceStatus<'a> {
    pub device_id: &'a str,
    pub door_status: &'a str,
    pub rfid_enabled: bool,
    pub battery_percentage: i64,
    pub uptime_seconds: i64,
    pub wifi_rssi: i64,
    pub free_heap: i64,
    pub session_id: &'a str,
    pub location: &'a str,
    pub spam_detected: bool,
    pub total_access_count: i64,
}

/// One appended access-log row.
#[derive(Debug, Clone, FromRow)]
pub struct AccessLogRow {
    pub id: i64,
    pub device_id: String,
    pub card_uid: String,
    pub access_granted: bool,
    pub access_type: String,
    pub user_name: Option<String>,
    pub timestamp: i64,
    pub session_id: String,
    pub created_at: i64,
}

/// Values for an access-log append.
#[derive(Debug, Clone)]
pub struct NewAccessLog<'a> {
    pub device_id: &'a str,
    pub card_uid: &'a str,
    pub access_granted: bool,
    pub access_type: &'a str,
    pub user_name: Option<&'a str>,
    pub timestamp: i64,
    pub session_id: &'a str,
}

/// A remote command row.
#[derive(Debug, Clone, FromRow)]
pub struct CommandRow {
    pub command_id: String,
    pub device_id: String,
    pub command_type: String,
    pub command_payload: String,
    pub status: String,
    pub created_at: i64,
    pub sent_at: Option<i64>,
    pub executed_at: Option<i64>,
    pub ack_received_at: Option<i64>,
    pub retry_count: i64,
    pub error_message: Option<String>,
}

/// A command re-queued by a bulk retry.
#[derive(Debug, Clone, FromRow)]
pub struct RetriedCommandRow {
    pub command_id: String,
    pub device_id: String,
    pub command_type: String,
}

/// One (command_type, status) aggregation bucket.
#[derive(Debug, Clone, FromRow)]
pub struct CommandStatRow {
    pub command_type: String,
    pub status: String,
    pub count: i64,
    pub avg_execution_secs: Option<f64>,
}

/// Fleet-overview row: device joined with its latest status.
#[derive(Debug, Clone, FromRow)]
pub struct FleetStatusRow {
    pub device_id: String,
    pub device_name: String,
    pub location: String,
    pub is_active: bool,
    pub door_status: Option<String>,
    pub rfid_enabled: Option<bool>,
    pub battery_percentage: Option<i64>,
    pub last_sync: Option<i64>,
}
