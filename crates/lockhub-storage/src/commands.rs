//! Remote-command queries: the store-and-forward queue.
//!
//! The lease is the one operation here that must be exactly-once per call:
//! the SELECT and the transition to `sent` share a transaction, so two
//! concurrent leases for the same device serialize on the store's write lock
//! and can never split the same pending set differently.

use sqlx::{Sqlite, Transaction};

use crate::db::{Database, StorageError, unix_timestamp};
use crate::models::{CommandRow, CommandStatRow, RetriedCommandRow};

/// Pending selection, oldest first. Ties on `created_at` (second resolution)
/// break by rowid, which is insertion order.
const SELECT_PENDING: &str = "SELECT * FROM remote_commands \
     WHERE device_id = ? AND status IN ('queued', 'sent') \
     ORDER BY created_at ASC, rowid ASC";

impl Database {
    /// Insert a freshly issued command with status `queued`.
    pub async fn insert_command(
        &self,
        command_id: &str,
        device_id: &str,
        command_type: &str,
        payload_json: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO remote_commands (\
                 command_id, device_id, command_type, command_payload, \
                 status, created_at, retry_count\
             ) VALUES (?, ?, ?, ?, 'queued', ?, 0)",
        )
        .bind(command_id)
        .bind(device_id)
        .bind(command_type)
        .bind(payload_json)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Lease every pending command for the device inside the given
    /// transaction: select `queued`/`sent` in FIFO order, then mark all of
    /// them `sent` with a fresh sent timestamp. Calling again before any
    /// acknowledgment returns the same set.
    pub async fn lease_commands(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        device_id: &str,
    ) -> Result<Vec<CommandRow>, StorageError> {
        let mut rows = sqlx::query_as::<_, CommandRow>(SELECT_PENDING)
            .bind(device_id)
            .fetch_all(&mut **tx)
            .await?;

        let now = unix_timestamp();
        for row in &mut rows {
            sqlx::query(
                "UPDATE remote_commands SET status = 'sent', sent_at = ? WHERE command_id = ?",
            )
            .bind(now)
            .bind(&row.command_id)
            .execute(&mut **tx)
            .await?;

            row.status = "sent".to_string();
            row.sent_at = Some(now);
        }

        Ok(rows)
    }

    /// Lease in a standalone transaction (outside a sync).
    pub async fn lease_commands_standalone(
        &self,
        device_id: &str,
    ) -> Result<Vec<CommandRow>, StorageError> {
        let mut tx = self.pool().begin().await?;
        let rows = self.lease_commands(&mut tx, device_id).await?;
        tx.commit().await?;
        Ok(rows)
    }

    /// Read the pending set without transitioning anything.
    pub async fn peek_commands(&self, device_id: &str) -> Result<Vec<CommandRow>, StorageError> {
        let rows = sqlx::query_as::<_, CommandRow>(SELECT_PENDING)
            .bind(device_id)
            .fetch_all(self.pool())
            .await?;

        Ok(rows)
    }

    /// Get one command record.
    pub async fn get_command(&self, command_id: &str) -> Result<Option<CommandRow>, StorageError> {
        let row =
            sqlx::query_as::<_, CommandRow>("SELECT * FROM remote_commands WHERE command_id = ?")
                .bind(command_id)
                .fetch_optional(self.pool())
                .await?;

        Ok(row)
    }

    /// Apply a device acknowledgment. The status guard keeps terminal
    /// commands untouched; returns false when nothing matched (unknown id or
    /// already terminal).
    pub async fn acknowledge_command(
        &self,
        command_id: &str,
        status: &str,
        executed_at: i64,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE remote_commands \
             SET status = ?, executed_at = ?, ack_received_at = ? \
             WHERE command_id = ? AND status IN ('queued', 'sent')",
        )
        .bind(status)
        .bind(executed_at)
        .bind(unix_timestamp())
        .bind(command_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Cancel a command still in `queued`/`sent`. Returns false when the
    /// guard did not match.
    pub async fn cancel_command(&self, command_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE remote_commands \
             SET status = 'cancelled', error_message = 'cancelled by operator' \
             WHERE command_id = ? AND status IN ('queued', 'sent')",
        )
        .bind(command_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Re-queue failed commands that still have retry budget, optionally
    /// scoped to one device. Increments the retry counter and clears the
    /// error message.
    pub async fn retry_failed_commands(
        &self,
        device_id: Option<&str>,
        max_retries: i64,
    ) -> Result<Vec<RetriedCommandRow>, StorageError> {
        let rows = match device_id {
            Some(device_id) => {
                sqlx::query_as::<_, RetriedCommandRow>(
                    "UPDATE remote_commands \
                     SET status = 'queued', retry_count = retry_count + 1, error_message = NULL \
                     WHERE status = 'failed' AND retry_count < ? AND device_id = ? \
                     RETURNING command_id, device_id, command_type",
                )
                .bind(max_retries)
                .bind(device_id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, RetriedCommandRow>(
                    "UPDATE remote_commands \
                     SET status = 'queued', retry_count = retry_count + 1, error_message = NULL \
                     WHERE status = 'failed' AND retry_count < ? \
                     RETURNING command_id, device_id, command_type",
                )
                .bind(max_retries)
                .fetch_all(self.pool())
                .await?
            }
        };

        Ok(rows)
    }

    /// Record the failure reason on a command (last error wins).
    pub async fn set_command_error(
        &self,
        command_id: &str,
        message: &str,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE remote_commands SET error_message = ? WHERE command_id = ?")
            .bind(message)
            .bind(command_id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Command history for a device, newest first, optional status filter.
    pub async fn command_history(
        &self,
        device_id: &str,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<CommandRow>, StorageError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, CommandRow>(
                    "SELECT * FROM remote_commands \
                     WHERE device_id = ? AND status = ? \
                     ORDER BY created_at DESC, rowid DESC LIMIT ?",
                )
                .bind(device_id)
                .bind(status)
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, CommandRow>(
                    "SELECT * FROM remote_commands \
                     WHERE device_id = ? \
                     ORDER BY created_at DESC, rowid DESC LIMIT ?",
                )
                .bind(device_id)
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
        };

        Ok(rows)
    }

    /// Every pending command across all devices, oldest first.
    pub async fn pending_commands(&self) -> Result<Vec<CommandRow>, StorageError> {
        let rows = sqlx::query_as::<_, CommandRow>(
            "SELECT * FROM remote_commands \
             WHERE status IN ('queued', 'sent') \
             ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Per-type, per-status counts and mean execution latency over the
    /// trailing window.
    pub async fn command_statistics(&self, hours: i64) -> Result<Vec<CommandStatRow>, StorageError> {
        let cutoff = unix_timestamp() - hours * 3600;

        let rows = sqlx::query_as::<_, CommandStatRow>(
            "SELECT command_type, status, COUNT(*) AS count, \
                    AVG(executed_at - created_at) AS avg_execution_secs \
             FROM remote_commands \
             WHERE created_at >= ? \
             GROUP BY command_type, status \
             ORDER BY command_type, status",
        )
        .bind(cutoff)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        db.insert_command("cmd_1", "doorlock_otista_001", "unlock_timer", "{}")
            .await
            .unwrap();
        db.insert_command("cmd_2", "doorlock_otista_001", "rfid_control", "{}")
            .await
            .unwrap();
        db.insert_command("cmd_3", "doorlock_kemayoran_002", "rfid_control", "{}")
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_lease_marks_sent_and_is_idempotent() {
        let db = seeded_db().await;

        let first = db
            .lease_commands_standalone("doorlock_otista_001")
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|c| c.status == "sent"));
        let stored = db.get_command("cmd_1").await.unwrap().unwrap();
        assert_eq!(stored.status, "sent");
        assert!(stored.sent_at.is_some());

        let second = db
            .lease_commands_standalone("doorlock_otista_001")
            .await
            .unwrap();
        let first_ids: Vec<_> = first.iter().map(|c| c.command_id.clone()).collect();
        let second_ids: Vec<_> = second.iter().map(|c| c.command_id.clone()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[tokio::test]
    async fn test_lease_is_scoped_per_device() {
        let db = seeded_db().await;

        let leased = db
            .lease_commands_standalone("doorlock_otista_001")
            .await
            .unwrap();
        assert!(leased.iter().all(|c| c.device_id == "doorlock_otista_001"));

        let other = db.get_command("cmd_3").await.unwrap().unwrap();
        assert_eq!(other.status, "queued");
    }

    #[tokio::test]
    async fn test_acknowledge_guards_terminal_states() {
        let db = seeded_db().await;
        db.lease_commands_standalone("doorlock_otista_001")
            .await
            .unwrap();

        let now = unix_timestamp();
        assert!(db.acknowledge_command("cmd_1", "success", now).await.unwrap());
        // Second ack on a terminal command does not match the guard.
        assert!(!db.acknowledge_command("cmd_1", "failed", now).await.unwrap());
        // Unknown id.
        assert!(!db.acknowledge_command("cmd_999", "success", now).await.unwrap());

        let row = db.get_command("cmd_1").await.unwrap().unwrap();
        assert_eq!(row.status, "success");
        assert_eq!(row.executed_at, Some(now));
        assert!(row.ack_received_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_only_from_pending() {
        let db = seeded_db().await;

        assert!(db.cancel_command("cmd_2").await.unwrap());
        let row = db.get_command("cmd_2").await.unwrap().unwrap();
        assert_eq!(row.status, "cancelled");
        assert_eq!(row.error_message.as_deref(), Some("cancelled by operator"));

        // Already cancelled: guard fails.
        assert!(!db.cancel_command("cmd_2").await.unwrap());
    }

    #[tokio::test]
    async fn test_retry_failed_respects_budget() {
        let db = seeded_db().await;
        db.lease_commands_standalone("doorlock_otista_001")
            .await
            .unwrap();
        db.acknowledge_command("cmd_1", "failed", unix_timestamp())
            .await
            .unwrap();

        let retried = db
            .retry_failed_commands(Some("doorlock_otista_001"), 3)
            .await
            .unwrap();
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].command_id, "cmd_1");

        let row = db.get_command("cmd_1").await.unwrap().unwrap();
        assert_eq!(row.status, "queued");
        assert_eq!(row.retry_count, 1);
        assert!(row.error_message.is_none());

        // Exhaust the budget: with max_retries equal to the current count,
        // nothing is touched.
        db.lease_commands_standalone("doorlock_otista_001")
            .await
            .unwrap();
        db.acknowledge_command("cmd_1", "failed", unix_timestamp())
            .await
            .unwrap();
        let retried = db
            .retry_failed_commands(Some("doorlock_otista_001"), 1)
            .await
            .unwrap();
        assert!(retried.is_empty());
    }

    #[tokio::test]
    async fn test_statistics_buckets() {
        let db = seeded_db().await;
        db.lease_commands_standalone("doorlock_otista_001")
            .await
            .unwrap();
        db.acknowledge_command("cmd_1", "success", unix_timestamp())
            .await
            .unwrap();

        let stats = db.command_statistics(24).await.unwrap();
        let success = stats
            .iter()
            .find(|s| s.command_type == "unlock_timer" && s.status == "success")
            .unwrap();
        assert_eq!(success.count, 1);

        let queued: i64 = stats
            .iter()
            .filter(|s| s.status == "queued")
            .map(|s| s.count)
            .sum();
        assert_eq!(queued, 1);
    }
}
