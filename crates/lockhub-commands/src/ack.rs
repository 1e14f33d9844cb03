//! Batch acknowledgment processing.
//!
//! Devices report execution results for previously delivered commands in a
//! single batch. One bad entry never aborts the rest; the processor returns
//! the exact count it applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::command::AckStatus;
use crate::queue::{CommandError, CommandQueue};

/// One acknowledgment entry as the device sends it. Status and timestamp
/// stay raw strings here: parse failures are per-entry conditions the
/// processor skips, not envelope validation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandAck {
    pub command_id: String,
    pub status: String,
    pub executed_at: String,
}

/// Applies a batch of device acknowledgments to the command queue.
#[derive(Clone)]
pub struct AckProcessor {
    queue: CommandQueue,
}

impl AckProcessor {
    pub fn new(queue: CommandQueue) -> Self {
        Self { queue }
    }

    /// Process the batch, skipping-and-logging bad entries. Returns how many
    /// entries were applied.
    pub async fn process(&self, device_id: &str, entries: &[CommandAck]) -> usize {
        let mut applied = 0;

        for entry in entries {
            let Some(status) = AckStatus::parse(&entry.status) else {
                warn!(
                    device_id = %device_id,
                    command_id = %entry.command_id,
                    status = %entry.status,
                    "skipping acknowledgment with unknown status"
                );
                continue;
            };

            let executed_at = match parse_timestamp(&entry.executed_at) {
                Some(ts) => ts,
                None => {
                    warn!(
                        device_id = %device_id,
                        command_id = %entry.command_id,
                        timestamp = %entry.executed_at,
                        "skipping acknowledgment with unparseable timestamp"
                    );
                    continue;
                }
            };

            match self.queue.acknowledge(&entry.command_id, status, executed_at).await {
                Ok(()) => applied += 1,
                Err(CommandError::NotFound(id)) => {
                    warn!(device_id = %device_id, command_id = %id, "acknowledgment for unknown command");
                }
                Err(CommandError::Conflict { command_id, status }) => {
                    warn!(
                        device_id = %device_id,
                        command_id = %command_id,
                        current_status = %status,
                        "acknowledgment for command in terminal state"
                    );
                }
                Err(e) => {
                    warn!(
                        device_id = %device_id,
                        command_id = %entry.command_id,
                        error = %e,
                        "failed to apply acknowledgment"
                    );
                }
            }
        }

        applied
    }
}

/// Parse a device-supplied RFC 3339 timestamp.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
