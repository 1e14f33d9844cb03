//! Device registry service.
//!
//! Devices are created on first contact and never hard-deleted; removal is a
//! soft deactivation that keeps history queryable.

use sqlx::{Sqlite, Transaction};
use tracing::info;

use lockhub_core::Location;
use lockhub_storage::{Database, FleetStatusRow};

use crate::device::{Device, DeviceError, DeviceStatus};

/// Registry over the persistent store. Cheap to clone.
#[derive(Clone)]
pub struct DeviceRegistry {
    db: Database,
}

impl DeviceRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Ensure the device exists, creating it with defaults on first contact.
    /// Runs inside the caller's transaction so a failed sync leaves no
    /// half-created device state behind. Returns true when the device was
    /// created.
    pub async fn ensure_registered(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        device_id: &str,
        location: Location,
    ) -> Result<bool, DeviceError> {
        let created = self
            .db
            .ensure_device(tx, device_id, &location.display_name(), location.as_str())
            .await?;

        if created {
            info!(device_id = %device_id, location = %location, "device registered on first contact");
        }

        self.db.touch_device(tx, device_id).await?;
        Ok(created)
    }

    /// Get a device record, or a not-found error.
    pub async fn get(&self, device_id: &str) -> Result<Device, DeviceError> {
        let row = self
            .db
            .get_device(device_id)
            .await?
            .ok_or_else(|| DeviceError::NotFound(device_id.to_string()))?;

        Ok(Device::from(row))
    }

    /// Require the device to exist and be active (the guard command
    /// issuance runs before inserting).
    pub async fn require_active(&self, device_id: &str) -> Result<Device, DeviceError> {
        let device = self.get(device_id).await?;
        if !device.is_active {
            return Err(DeviceError::Inactive(device_id.to_string()));
        }
        Ok(device)
    }

    /// Soft-deactivate a device.
    pub async fn deactivate(&self, device_id: &str) -> Result<(), DeviceError> {
        let deactivated = self.db.deactivate_device(device_id).await?;
        if !deactivated {
            return Err(DeviceError::NotFound(device_id.to_string()));
        }

        info!(device_id = %device_id, "device deactivated");
        Ok(())
    }

    /// The stored status for one device.
    pub async fn status(&self, device_id: &str) -> Result<DeviceStatus, DeviceError> {
        let row = self
            .db
            .get_device_status(device_id)
            .await?
            .ok_or_else(|| DeviceError::NotFound(device_id.to_string()))?;

        DeviceStatus::try_from(row)
    }

    /// Active devices joined with their latest status, for the fleet
    /// overview.
    pub async fn fleet(&self) -> Result<Vec<FleetStatusRow>, DeviceError> {
        Ok(self.db.list_fleet_status().await?)
    }
}
