//! Persistent command queue.
//!
//! Every mutation of a command row goes through this service so the
//! lifecycle transitions stay confined to one place. The queue itself holds
//! no state: the `remote_commands` table is the queue, and the lease
//! transition runs inside a store transaction (two concurrent leases for the
//! same device serialize there, not on an application lock).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use lockhub_core::{CommandId, DeviceId};
use lockhub_storage::{Database, StorageError};

use crate::command::{
    AckStatus, CommandPayload, CommandRecord, CommandStatus, CommandType, new_command_id,
};

/// Command queue error types.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command not found: {0}")]
    NotFound(CommandId),

    #[error("command {command_id} is {status}; operation only valid from queued or sent")]
    Conflict {
        command_id: CommandId,
        status: CommandStatus,
    },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("corrupt command record: {0}")]
    Corrupt(String),
}

/// A command re-queued by a bulk retry.
#[derive(Debug, Clone, Serialize)]
pub struct RetriedCommand {
    pub command_id: CommandId,
    pub device_id: DeviceId,
    pub command_type: CommandType,
}

/// One aggregation bucket from the statistics query.
#[derive(Debug, Clone, Serialize)]
pub struct CommandStat {
    pub command_type: String,
    pub status: String,
    pub count: i64,
    pub avg_execution_secs: Option<f64>,
}

/// The command queue service.
#[derive(Clone)]
pub struct CommandQueue {
    db: Database,
}

impl CommandQueue {
    /// Create a queue over the given store.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new command with status `queued`. The device row is not
    /// required to exist yet; callers that must reject unknown devices
    /// validate first.
    pub async fn enqueue(
        &self,
        device_id: &str,
        command_type: CommandType,
        payload: &CommandPayload,
    ) -> Result<CommandId, CommandError> {
        let command_id = new_command_id();
        let payload_json = serde_json::to_string(&payload.to_json())
            .map_err(|e| CommandError::InvalidPayload(e.to_string()))?;

        self.db
            .insert_command(&command_id, device_id, command_type.as_str(), &payload_json)
            .await?;

        info!(
            command_id = %command_id,
            device_id = %device_id,
            command_type = %command_type,
            "command queued"
        );

        Ok(command_id)
    }

    /// Lease the device's pending commands: mark them `sent` and return them
    /// in creation order. Idempotent until an acknowledgment arrives.
    pub async fn lease(&self, device_id: &str) -> Result<Vec<CommandRecord>, CommandError> {
        let rows = self.db.lease_commands_standalone(device_id).await?;
        self.into_records(rows, device_id)
    }

    /// Lease inside an already-open transaction (the sync path, where the
    /// lease must commit or roll back together with the status and log
    /// writes).
    pub async fn lease_in(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        device_id: &str,
    ) -> Result<Vec<CommandRecord>, CommandError> {
        let rows = self.db.lease_commands(tx, device_id).await?;
        self.into_records(rows, device_id)
    }

    /// Read the pending set without leasing.
    pub async fn peek(&self, device_id: &str) -> Result<Vec<CommandRecord>, CommandError> {
        let rows = self.db.peek_commands(device_id).await?;
        rows.into_iter()
            .map(|r| CommandRecord::from_row(r).map_err(|e| CommandError::Corrupt(e.to_string())))
            .collect()
    }

    /// Get one command.
    pub async fn get(&self, command_id: &str) -> Result<CommandRecord, CommandError> {
        let row = self
            .db
            .get_command(command_id)
            .await?
            .ok_or_else(|| CommandError::NotFound(command_id.to_string()))?;

        CommandRecord::from_row(row).map_err(|e| CommandError::Corrupt(e.to_string()))
    }

    /// Apply a device acknowledgment: `sent -> success | failed | timeout`,
    /// recording both the device's execution time and the server arrival
    /// time. Acknowledging an unknown or already-terminal command is an
    /// error here; the batch processor decides whether that is fatal.
    pub async fn acknowledge(
        &self,
        command_id: &str,
        status: AckStatus,
        executed_at: DateTime<Utc>,
    ) -> Result<(), CommandError> {
        let applied = self
            .db
            .acknowledge_command(command_id, status.as_str(), executed_at.timestamp())
            .await?;

        if !applied {
            // Distinguish a missing command from a terminal-state conflict.
            return match self.db.get_command(command_id).await? {
                None => Err(CommandError::NotFound(command_id.to_string())),
                Some(row) => {
                    let current = CommandStatus::parse(&row.status)
                        .ok_or_else(|| CommandError::Corrupt(row.status.clone()))?;
                    Err(CommandError::Conflict {
                        command_id: command_id.to_string(),
                        status: current,
                    })
                }
            };
        }

        debug!(command_id = %command_id, status = %status.as_str(), "command acknowledged");
        Ok(())
    }

    /// Cancel a command still in `queued`/`sent`. Returns the status the
    /// command was in before cancellation.
    pub async fn cancel(&self, command_id: &str) -> Result<CommandStatus, CommandError> {
        let before = self.get(command_id).await?;

        if !before.status.is_pending() {
            return Err(CommandError::Conflict {
                command_id: command_id.to_string(),
                status: before.status,
            });
        }

        let applied = self.db.cancel_command(command_id).await?;
        if !applied {
            // Lost a race with an acknowledgment; report the fresh status.
            let current = self.get(command_id).await?;
            return Err(CommandError::Conflict {
                command_id: command_id.to_string(),
                status: current.status,
            });
        }

        info!(command_id = %command_id, "command cancelled");
        Ok(before.status)
    }

    /// Bulk-retry failed commands with remaining budget, optionally scoped
    /// to one device.
    pub async fn retry_failed(
        &self,
        device_id: Option<&str>,
        max_retries: u32,
    ) -> Result<Vec<RetriedCommand>, CommandError> {
        let rows = self
            .db
            .retry_failed_commands(device_id, max_retries as i64)
            .await?;

        if !rows.is_empty() {
            info!(count = rows.len(), device_id = ?device_id, "failed commands re-queued");
        }

        Ok(rows
            .into_iter()
            .map(|r| RetriedCommand {
                command_id: r.command_id,
                device_id: r.device_id,
                command_type: CommandType::parse(&r.command_type),
            })
            .collect())
    }

    /// Command history for a device, newest first.
    pub async fn history(
        &self,
        device_id: &str,
        status: Option<CommandStatus>,
        limit: i64,
    ) -> Result<Vec<CommandRecord>, CommandError> {
        let rows = self
            .db
            .command_history(device_id, status.map(|s| s.as_str()), limit)
            .await?;

        rows.into_iter()
            .map(|r| CommandRecord::from_row(r).map_err(|e| CommandError::Corrupt(e.to_string())))
            .collect()
    }

    /// Every pending command across all devices, oldest first.
    pub async fn pending_all(&self) -> Result<Vec<CommandRecord>, CommandError> {
        let rows = self.db.pending_commands().await?;
        rows.into_iter()
            .map(|r| CommandRecord::from_row(r).map_err(|e| CommandError::Corrupt(e.to_string())))
            .collect()
    }

    /// Execution statistics over the trailing window.
    pub async fn statistics(&self, hours: i64) -> Result<Vec<CommandStat>, CommandError> {
        let rows = self.db.command_statistics(hours).await?;
        Ok(rows
            .into_iter()
            .map(|r| CommandStat {
                command_type: r.command_type,
                status: r.status,
                count: r.count,
                avg_execution_secs: r.avg_execution_secs,
            })
            .collect())
    }

    fn into_records(
        &self,
        rows: Vec<lockhub_storage::CommandRow>,
        device_id: &str,
    ) -> Result<Vec<CommandRecord>, CommandError> {
        let records: Result<Vec<_>, _> = rows
            .into_iter()
            .map(|r| CommandRecord::from_row(r).map_err(|e| CommandError::Corrupt(e.to_string())))
            .collect();
        let records = records?;

        if !records.is_empty() {
            debug!(device_id = %device_id, count = records.len(), "commands leased");
        }

        Ok(records)
    }
}
