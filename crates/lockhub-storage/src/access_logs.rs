//! Access-log queries. Append-only; no dedup key (see the migration note).

use sqlx::{Sqlite, Transaction};

use crate::db::{Database, StorageError, unix_timestamp};
use crate::models::{AccessLogRow, NewAccessLog};

impl Database {
    /// Append one access-log row.
    pub async fn insert_access_log(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        log: &NewAccessLog<'_>,
    ) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO access_logs (\
                 device_id, card_uid, access_granted, access_type, \
                 user_name, timestamp, session_id, created_at\
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(log.device_id)
        .bind(log.card_uid)
        .bind(log.access_granted)
        .bind(log.access_type)
        .bind(log.user_name)
        .bind(log.timestamp)
        .bind(log.session_id)
        .bind(unix_timestamp())
        .execute(&mut **tx)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Recent access logs for a device within the trailing `hours` window,
    /// newest first.
    pub async fn recent_access_logs(
        &self,
        device_id: &str,
        hours: i64,
        limit: i64,
    ) -> Result<Vec<AccessLogRow>, StorageError> {
        let cutoff = unix_timestamp() - hours * 3600;

        let rows = sqlx::query_as::<_, AccessLogRow>(
            "SELECT * FROM access_logs \
             WHERE device_id = ? AND timestamp >= ? \
             ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(device_id)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
