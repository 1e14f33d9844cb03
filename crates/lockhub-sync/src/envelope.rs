//! Wire envelopes for the device-facing endpoints.
//!
//! Both device POSTs wrap their payload in a top-level `doorlock` object;
//! the firmware has shipped with that shape since v1 and it stays.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use lockhub_commands::{CommandAck, CommandRecord};
use lockhub_core::{Location, validate_device_id};
use lockhub_devices::StatusSnapshot;

/// Sync (bulk upload) request.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncRequest {
    pub doorlock: SyncUpload,
}

/// The sync payload a device uploads every check-in.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncUpload {
    pub device_id: String,
    pub location: Location,
    pub sync_session: SyncSession,
    pub current_status: StatusSnapshot,
    #[serde(default)]
    pub access_logs: Vec<AccessLogEntry>,
    #[serde(default)]
    pub spam_detected: bool,
    pub total_access_count: u64,
    pub timestamp: String,
}

impl SyncUpload {
    /// Reject a malformed envelope before any state mutation. Per-record
    /// access-log problems are deliberately not checked here; those are
    /// skipped individually during ingestion.
    pub fn validate(&self) -> Result<(), String> {
        validate_device_id(&self.device_id).map_err(|e| e.to_string())?;

        if self.sync_session.session_id.is_empty() {
            return Err("session_id must not be empty".to_string());
        }

        self.current_status.validate()?;

        Ok(())
    }
}

/// Device-generated sync session descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSession {
    pub session_id: String,
    pub period: SyncPeriod,
}

/// The buffered interval this sync covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPeriod {
    pub from: String,
    pub to: String,
}

/// One buffered access event. The timestamp stays a raw string: an
/// unparseable one drops that record, not the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub card_uid: String,
    pub access_granted: bool,
    #[serde(default = "default_access_type")]
    pub access_type: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub timestamp: String,
}

fn default_access_type() -> String {
    "rfid".to_string()
}

/// Sync response: session acknowledgment plus the leased commands.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub doorlock: SyncResponseBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResponseBody {
    pub device_id: String,
    pub session_ack: String,
    pub commands: Vec<CommandDelivery>,
    pub timestamp: String,
}

impl SyncResponse {
    pub fn new(device_id: String, session_ack: String, commands: Vec<CommandDelivery>) -> Self {
        Self {
            doorlock: SyncResponseBody {
                device_id,
                session_ack,
                commands,
                timestamp: Utc::now().to_rfc3339(),
            },
        }
    }
}

/// The flattened form a command takes on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDelivery {
    pub command_id: String,
    #[serde(rename = "type")]
    pub command_type: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl From<&CommandRecord> for CommandDelivery {
    fn from(record: &CommandRecord) -> Self {
        Self {
            command_id: record.command_id.clone(),
            command_type: record.command_type.as_str().to_string(),
            action: record.payload.action(),
            duration_minutes: record.payload.duration_minutes(),
        }
    }
}

/// Acknowledgment request.
#[derive(Debug, Clone, Deserialize)]
pub struct AckRequest {
    pub doorlock: AckUpload,
}

/// The acknowledgment payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AckUpload {
    pub device_id: String,
    pub command_responses: Vec<CommandAck>,
    pub timestamp: String,
}

impl AckUpload {
    pub fn validate(&self) -> Result<(), String> {
        validate_device_id(&self.device_id).map_err(|e| e.to_string())
    }
}
