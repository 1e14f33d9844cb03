//! Command data structures.
//!
//! Defines the command lifecycle state machine and the typed payload union.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lockhub_core::{CommandId, DeviceId};
use lockhub_storage::CommandRow;

/// Generate a new command identifier.
pub fn new_command_id() -> CommandId {
    let hex = Uuid::new_v4().simple().to_string();
    format!("cmd_{}", &hex[..12])
}

/// Command lifecycle status.
///
/// Transitions:
/// ```text
/// queued --(lease)--> sent --(ack success)--> success
/// queued --(lease)--> sent --(ack failed)-->  failed
/// sent   --(ack timeout)--> timeout
/// failed --(retry)--> queued
/// queued|sent --(cancel)--> cancelled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// Waiting to be delivered on the device's next sync
    Queued,
    /// Handed to the device, awaiting acknowledgment
    Sent,
    /// Device reported successful execution
    Success,
    /// Device reported failure
    Failed,
    /// Device reported an execution timeout
    Timeout,
    /// Cancelled by an operator
    Cancelled,
}

impl CommandStatus {
    /// Check if the status is terminal (`failed` is terminal only once the
    /// retry budget is exhausted, which this method cannot see; use
    /// [`CommandRecord::is_retryable`] for that).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandStatus::Success | CommandStatus::Timeout | CommandStatus::Cancelled
        )
    }

    /// Check if the status is eligible for delivery to a device.
    pub fn is_pending(&self) -> bool {
        matches!(self, CommandStatus::Queued | CommandStatus::Sent)
    }

    /// Check whether moving to `next` follows the transition graph.
    pub fn can_transition_to(&self, next: CommandStatus) -> bool {
        use CommandStatus::*;
        match (self, next) {
            (Queued, Sent) | (Queued, Cancelled) => true,
            // Re-lease before an ack re-sends the same command.
            (Sent, Sent) => true,
            (Sent, Success) | (Sent, Failed) | (Sent, Timeout) | (Sent, Cancelled) => true,
            (Failed, Queued) => true,
            _ => false,
        }
    }

    /// Status tag as stored and sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Queued => "queued",
            CommandStatus::Sent => "sent",
            CommandStatus::Success => "success",
            CommandStatus::Failed => "failed",
            CommandStatus::Timeout => "timeout",
            CommandStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored status tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(CommandStatus::Queued),
            "sent" => Some(CommandStatus::Sent),
            "success" => Some(CommandStatus::Success),
            "failed" => Some(CommandStatus::Failed),
            "timeout" => Some(CommandStatus::Timeout),
            "cancelled" => Some(CommandStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Acknowledgment status a device may report for a delivered command.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Failed,
    Timeout,
}

impl AckStatus {
    /// The lifecycle status this acknowledgment transitions the command to.
    pub fn command_status(&self) -> CommandStatus {
        match self {
            AckStatus::Success => CommandStatus::Success,
            AckStatus::Failed => CommandStatus::Failed,
            AckStatus::Timeout => CommandStatus::Timeout,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AckStatus::Success => "success",
            AckStatus::Failed => "failed",
            AckStatus::Timeout => "timeout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(AckStatus::Success),
            "failed" => Some(AckStatus::Failed),
            "timeout" => Some(AckStatus::Timeout),
            _ => None,
        }
    }
}

/// Command type. The set is open: types this build does not know are carried
/// through untouched so older servers can still relay newer commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum CommandType {
    /// Unlock the door for a bounded number of minutes
    UnlockTimer,
    /// Enable or disable the RFID reader
    RfidControl,
    /// A type this build does not know
    Other(String),
}

impl CommandType {
    pub fn as_str(&self) -> &str {
        match self {
            CommandType::UnlockTimer => "unlock_timer",
            CommandType::RfidControl => "rfid_control",
            CommandType::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "unlock_timer" => CommandType::UnlockTimer,
            "rfid_control" => CommandType::RfidControl,
            other => CommandType::Other(other.to_string()),
        }
    }
}

impl From<String> for CommandType {
    fn from(s: String) -> Self {
        CommandType::parse(&s)
    }
}

impl From<CommandType> for String {
    fn from(t: CommandType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// RFID reader action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RfidAction {
    Enable,
    Disable,
}

impl RfidAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RfidAction::Enable => "enable",
            RfidAction::Disable => "disable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "enable" => Some(RfidAction::Enable),
            "disable" => Some(RfidAction::Disable),
            _ => None,
        }
    }
}

/// Typed command payload, keyed by command type. Unknown types round-trip
/// through the opaque arm without interpretation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CommandPayload {
    UnlockTimer {
        action: String,
        duration_minutes: u32,
    },
    RfidControl {
        action: RfidAction,
    },
    Opaque(serde_json::Value),
}

impl CommandPayload {
    /// Build an unlock-timer payload.
    pub fn unlock_timer(duration_minutes: u32) -> Self {
        CommandPayload::UnlockTimer {
            action: "unlock".to_string(),
            duration_minutes,
        }
    }

    /// Build an RFID control payload.
    pub fn rfid_control(action: RfidAction) -> Self {
        CommandPayload::RfidControl { action }
    }

    /// Interpret a stored payload according to the command type. A known
    /// type whose payload no longer parses degrades to opaque instead of
    /// failing the read path.
    pub fn from_stored(command_type: &CommandType, value: serde_json::Value) -> Self {
        match command_type {
            CommandType::UnlockTimer => serde_json::from_value(value.clone())
                .ok()
                .filter(|p| matches!(p, CommandPayload::UnlockTimer { .. }))
                .unwrap_or(CommandPayload::Opaque(value)),
            CommandType::RfidControl => serde_json::from_value(value.clone())
                .ok()
                .filter(|p| matches!(p, CommandPayload::RfidControl { .. }))
                .unwrap_or(CommandPayload::Opaque(value)),
            CommandType::Other(_) => CommandPayload::Opaque(value),
        }
    }

    /// The action field delivered to the device.
    pub fn action(&self) -> String {
        match self {
            CommandPayload::UnlockTimer { action, .. } => action.clone(),
            CommandPayload::RfidControl { action } => action.as_str().to_string(),
            CommandPayload::Opaque(value) => value
                .get("action")
                .and_then(|a| a.as_str())
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// The optional duration field delivered to the device.
    pub fn duration_minutes(&self) -> Option<u32> {
        match self {
            CommandPayload::UnlockTimer {
                duration_minutes, ..
            } => Some(*duration_minutes),
            CommandPayload::RfidControl { .. } => None,
            CommandPayload::Opaque(value) => value
                .get("duration_minutes")
                .and_then(|d| d.as_u64())
                .map(|d| d as u32),
        }
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A command record as the domain sees it.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRecord {
    /// Unique command ID
    pub command_id: CommandId,
    /// Target device
    pub device_id: DeviceId,
    /// Command type
    pub command_type: CommandType,
    /// Typed payload
    pub payload: CommandPayload,
    /// Lifecycle status
    pub status: CommandStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// When the command was last handed to the device
    pub sent_at: Option<DateTime<Utc>>,
    /// Device-reported execution time
    pub executed_at: Option<DateTime<Utc>>,
    /// Server time the acknowledgment arrived
    pub ack_received_at: Option<DateTime<Utc>>,
    /// Retry attempts consumed
    pub retry_count: u32,
    /// Last failure reason
    pub error_message: Option<String>,
}

impl CommandRecord {
    /// Whether a bulk retry with the given budget would re-queue this
    /// command.
    pub fn is_retryable(&self, max_retries: u32) -> bool {
        self.status == CommandStatus::Failed && self.retry_count < max_retries
    }

    /// Convert a storage row. Fails only on a status tag this build does not
    /// know, which would mean the table was written by something newer.
    pub fn from_row(row: CommandRow) -> Result<Self, UnknownStatus> {
        let status = CommandStatus::parse(&row.status).ok_or(UnknownStatus(row.status.clone()))?;
        let command_type = CommandType::parse(&row.command_type);
        let payload_value: serde_json::Value =
            serde_json::from_str(&row.command_payload).unwrap_or(serde_json::Value::Null);
        let payload = CommandPayload::from_stored(&command_type, payload_value);

        Ok(Self {
            command_id: row.command_id,
            device_id: row.device_id,
            command_type,
            payload,
            status,
            created_at: ts(row.created_at),
            sent_at: row.sent_at.map(ts),
            executed_at: row.executed_at.map(ts),
            ack_received_at: row.ack_received_at.map(ts),
            retry_count: row.retry_count as u32,
            error_message: row.error_message,
        })
    }
}

/// A status tag in the store that this build cannot interpret.
#[derive(Debug, thiserror::Error)]
#[error("unknown command status: {0}")]
pub struct UnknownStatus(pub String);

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
