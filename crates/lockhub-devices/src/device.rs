//! Device data structures.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use lockhub_core::config::fleet;
use lockhub_core::{DeviceId, SessionId};
use lockhub_storage::{AccessLogRow, DeviceRow, DeviceStatusRow};

/// Device error types.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device not found: {0}")]
    NotFound(DeviceId),

    #[error("device is not active: {0}")]
    Inactive(DeviceId),

    #[error("storage error: {0}")]
    Storage(#[from] lockhub_storage::StorageError),

    #[error("corrupt device record: {0}")]
    Corrupt(String),
}

/// Physical door state as reported by the device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Locked,
    Unlocked,
    Locking,
    Unlocking,
}

impl DoorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoorState::Locked => "locked",
            DoorState::Unlocked => "unlocked",
            DoorState::Locking => "locking",
            DoorState::Unlocking => "unlocking",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "locked" => Some(DoorState::Locked),
            "unlocked" => Some(DoorState::Unlocked),
            "locking" => Some(DoorState::Locking),
            "unlocking" => Some(DoorState::Unlocking),
            _ => None,
        }
    }
}

impl std::fmt::Display for DoorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A device record.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub device_id: DeviceId,
    pub device_name: String,
    pub location: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Self {
            device_id: row.device_id,
            device_name: row.device_name,
            location: row.location,
            is_active: row.is_active,
            created_at: ts(row.created_at),
            last_seen: row.last_seen.map(ts),
        }
    }
}

/// The live metrics a device reports on every sync. This is the wire shape
/// of `current_status` and the unit the cache stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub door_status: DoorState,
    pub rfid_enabled: bool,
    pub battery_percentage: u8,
    pub uptime_seconds: u64,
    pub wifi_rssi: i32,
    pub free_heap: u64,
}

impl StatusSnapshot {
    /// Range checks the serde layer cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.battery_percentage > 100 {
            return Err(format!(
                "battery_percentage out of range: {}",
                self.battery_percentage
            ));
        }
        if !(-100..=0).contains(&self.wifi_rssi) {
            return Err(format!("wifi_rssi out of range: {}", self.wifi_rssi));
        }
        Ok(())
    }
}

/// The stored per-device status, superseded wholesale by each sync.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub device_id: DeviceId,
    pub snapshot: StatusSnapshot,
    pub last_sync: DateTime<Utc>,
    pub session_id: SessionId,
    pub location: String,
    pub spam_detected: bool,
    pub total_access_count: u64,
}

impl DeviceStatus {
    /// Minutes since the last sync.
    pub fn sync_age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_sync).num_minutes()
    }

    /// Connection classification at `now`.
    pub fn connection_state(&self, now: DateTime<Utc>) -> ConnectionState {
        ConnectionState::classify(Some(self.last_sync), now)
    }
}

impl TryFrom<DeviceStatusRow> for DeviceStatus {
    type Error = DeviceError;

    fn try_from(row: DeviceStatusRow) -> Result<Self, Self::Error> {
        let door_status = DoorState::parse(&row.door_status)
            .ok_or_else(|| DeviceError::Corrupt(format!("door status: {}", row.door_status)))?;

        Ok(Self {
            device_id: row.device_id,
            snapshot: StatusSnapshot {
                door_status,
                rfid_enabled: row.rfid_enabled,
                battery_percentage: row.battery_percentage.clamp(0, 100) as u8,
                uptime_seconds: row.uptime_seconds.max(0) as u64,
                wifi_rssi: row.wifi_rssi as i32,
                free_heap: row.free_heap.max(0) as u64,
            },
            last_sync: ts(row.last_sync),
            session_id: row.session_id,
            location: row.location,
            spam_detected: row.spam_detected,
            total_access_count: row.total_access_count.max(0) as u64,
        })
    }
}

/// Fleet connection classification based on sync age.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Synced within the expected check-in interval
    Online,
    /// Missed one interval but not yet a full day
    Warning,
    /// No sync for over a day (or never)
    Offline,
}

impl ConnectionState {
    pub fn classify(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match last_sync {
            Some(last_sync) => {
                let age_min = (now - last_sync).num_minutes();
                if age_min < fleet::ONLINE_CUTOFF_MIN {
                    ConnectionState::Online
                } else if age_min < fleet::WARNING_CUTOFF_MIN {
                    ConnectionState::Warning
                } else {
                    ConnectionState::Offline
                }
            }
            None => ConnectionState::Offline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Online => "online",
            ConnectionState::Warning => "warning",
            ConnectionState::Offline => "offline",
        }
    }
}

/// One ingested access event.
#[derive(Debug, Clone, Serialize)]
pub struct AccessRecord {
    pub device_id: DeviceId,
    pub card_uid: String,
    pub access_granted: bool,
    pub access_type: String,
    pub user_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub session_id: SessionId,
}

impl From<AccessLogRow> for AccessRecord {
    fn from(row: AccessLogRow) -> Self {
        Self {
            device_id: row.device_id,
            card_uid: row.card_uid,
            access_granted: row.access_granted,
            access_type: row.access_type,
            user_name: row.user_name,
            timestamp: ts(row.timestamp),
            session_id: row.session_id,
        }
    }
}

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_door_state_roundtrip() {
        for state in [
            DoorState::Locked,
            DoorState::Unlocked,
            DoorState::Locking,
            DoorState::Unlocking,
        ] {
            assert_eq!(DoorState::parse(state.as_str()), Some(state));
        }
        assert_eq!(DoorState::parse("ajar"), None);
    }

    #[test]
    fn test_snapshot_validation() {
        let mut snapshot = StatusSnapshot {
            door_status: DoorState::Locked,
            rfid_enabled: true,
            battery_percentage: 87,
            uptime_seconds: 7200,
            wifi_rssi: -61,
            free_heap: 28000,
        };
        assert!(snapshot.validate().is_ok());

        snapshot.battery_percentage = 101;
        assert!(snapshot.validate().is_err());

        snapshot.battery_percentage = 87;
        snapshot.wifi_rssi = 5;
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_connection_classification() {
        let now = Utc::now();

        assert_eq!(
            ConnectionState::classify(Some(now - Duration::hours(2)), now),
            ConnectionState::Online
        );
        assert_eq!(
            ConnectionState::classify(Some(now - Duration::hours(12)), now),
            ConnectionState::Warning
        );
        assert_eq!(
            ConnectionState::classify(Some(now - Duration::hours(36)), now),
            ConnectionState::Offline
        );
        assert_eq!(ConnectionState::classify(None, now), ConnectionState::Offline);
    }

    #[test]
    fn test_snapshot_serde_shape() {
        let snapshot = StatusSnapshot {
            door_status: DoorState::Unlocking,
            rfid_enabled: false,
            battery_percentage: 42,
            uptime_seconds: 10,
            wifi_rssi: -80,
            free_heap: 1024,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["door_status"], "unlocking");
        assert_eq!(json["battery_percentage"], 42);

        let back: StatusSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
