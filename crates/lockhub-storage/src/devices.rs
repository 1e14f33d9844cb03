//! Device and device-status queries.

use sqlx::{Sqlite, Transaction};

use crate::db::{Database, StorageError, unix_timestamp};
use crate::models::{DeviceRow, DeviceStatusRow, FleetStatusRow, NewDeviceStatus};

impl Database {
    /// Insert the device if it does not exist yet. Returns true when a new
    /// row was created.
    pub async fn ensure_device(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        device_id: &str,
        device_name: &str,
        location: &str,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO devices (device_id, device_name, location, is_active, created_at) \
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(device_id)
        .bind(device_name)
        .bind(location)
        .bind(unix_timestamp())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stamp the device's last-seen time.
    pub async fn touch_device(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        device_id: &str,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE devices SET last_seen = ? WHERE device_id = ?")
            .bind(unix_timestamp())
            .bind(device_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Get a device record.
    pub async fn get_device(&self, device_id: &str) -> Result<Option<DeviceRow>, StorageError> {
        let row = sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE device_id = ?")
            .bind(device_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    /// Soft-deactivate a device. Returns false when the device is unknown.
    pub async fn deactivate_device(&self, device_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE devices SET is_active = 0 WHERE device_id = ?")
            .bind(device_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the device's status row wholesale (last write wins).
    pub async fn upsert_device_status(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        status: &NewDeviceStatus<'_>,
    ) -> Result<(), StorageError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO device_status (\
                 device_id, door_status, rfid_enabled, battery_percentage, \
                 uptime_seconds, wifi_rssi, free_heap, last_sync, session_id, \
                 location, spam_detected, total_access_count, updated_at\
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(device_id) DO UPDATE SET \
                 door_status = excluded.door_status, \
                 rfid_enabled = excluded.rfid_enabled, \
                 battery_percentage = excluded.battery_percentage, \
                 uptime_seconds = excluded.uptime_seconds, \
                 wifi_rssi = excluded.wifi_rssi, \
                 free_heap = excluded.free_heap, \
                 last_sync = excluded.last_sync, \
                 session_id = excluded.session_id, \
                 location = excluded.location, \
                 spam_detected = excluded.spam_detected, \
                 total_access_count = excluded.total_access_count, \
                 updated_at = excluded.updated_at",
        )
        .bind(status.device_id)
        .bind(status.door_status)
        .bind(status.rfid_enabled)
        .bind(status.battery_percentage)
        .bind(status.uptime_seconds)
        .bind(status.wifi_rssi)
        .bind(status.free_heap)
        .bind(now)
        .bind(status.session_id)
        .bind(status.location)
        .bind(status.spam_detected)
        .bind(status.total_access_count)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Get the stored status row for one device.
    pub async fn get_device_status(
        &self,
        device_id: &str,
    ) -> Result<Option<DeviceStatusRow>, StorageError> {
        let row =
            sqlx::query_as::<_, DeviceStatusRow>("SELECT * FROM device_status WHERE device_id = ?")
                .bind(device_id)
                .fetch_optional(self.pool())
                .await?;

        Ok(row)
    }

    /// List every active device joined with its latest status, for the fleet
    /// overview.
    pub async fn list_fleet_status(&self) -> Result<Vec<FleetStatusRow>, StorageError> {
        let rows = sqlx::query_as::<_, FleetStatusRow>(
            "SELECT d.device_id, d.device_name, d.location, d.is_active, \
                    ds.door_status, ds.rfid_enabled, ds.battery_percentage, ds.last_sync \
             FROM devices d \
             LEFT JOIN device_status ds ON d.device_id = ds.device_id \
             WHERE d.is_active = 1 \
             ORDER BY d.location, d.device_id",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
