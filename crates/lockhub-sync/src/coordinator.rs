//! Sync coordinator: one device check-in as one store transaction.

use chrono::Utc;
use tracing::{info, warn};

use lockhub_commands::ack::parse_timestamp;
use lockhub_commands::{AckProcessor, CommandError, CommandQueue};
use lockhub_devices::{DeviceError, DeviceRegistry, DeviceStatus, StatusCache};
use lockhub_storage::{Database, NewAccessLog, NewDeviceStatus, StorageError};

use crate::envelope::{AckUpload, CommandDelivery, SyncResponse, SyncUpload};

/// Sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Envelope rejected before any state mutation.
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// The whole sync transaction rolled back; the device retries the
    /// identical batch on its next contact.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// What a completed sync did, for logging and the response.
#[derive(Debug)]
pub struct SyncOutcome {
    pub response: SyncResponse,
    pub ingested_logs: usize,
    pub dropped_logs: usize,
    pub leased_commands: usize,
    pub device_created: bool,
}

/// Orchestrates device check-ins and acknowledgment batches.
#[derive(Clone)]
pub struct SyncCoordinator {
    db: Database,
    registry: DeviceRegistry,
    queue: CommandQueue,
    ack: AckProcessor,
    cache: StatusCache,
}

impl SyncCoordinator {
    pub fn new(
        db: Database,
        registry: DeviceRegistry,
        queue: CommandQueue,
        cache: StatusCache,
    ) -> Self {
        let ack = AckProcessor::new(queue.clone());
        Self {
            db,
            registry,
            queue,
            ack,
            cache,
        }
    }

    /// Run one check-in. Steps 2–6 (device row, status upsert, log append,
    /// lease) commit as one unit; the cache write afterwards is best-effort.
    pub async fn sync(&self, upload: SyncUpload) -> Result<SyncOutcome, SyncError> {
        upload.validate().map_err(SyncError::Validation)?;

        let device_id = upload.device_id.clone();
        let session_id = upload.sync_session.session_id.clone();

        let mut tx = self.db.pool().begin().await.map_err(StorageError::from)?;

        let device_created = self
            .registry
            .ensure_registered(&mut tx, &device_id, upload.location)
            .await?;

        self.db
            .upsert_device_status(
                &mut tx,
                &NewDeviceStatus {
                    device_id: &device_id,
                    door_status: upload.current_status.door_status.as_str(),
                    rfid_enabled: upload.current_status.rfid_enabled,
                    battery_percentage: upload.current_status.battery_percentage as i64,
                    uptime_seconds: upload.current_status.uptime_seconds as i64,
                    wifi_rssi: upload.current_status.wifi_rssi as i64,
                    free_heap: upload.current_status.free_heap as i64,
                    session_id: &session_id,
                    location: upload.location.as_str(),
                    spam_detected: upload.spam_detected,
                    total_access_count: upload.total_access_count as i64,
                },
            )
            .await?;

        // Records are replayed in the order the device sent them. A record
        // that fails to parse is dropped and logged, never the whole batch.
        let mut ingested_logs = 0;
        let mut dropped_logs = 0;
        for entry in &upload.access_logs {
            let Some(timestamp) = parse_timestamp(&entry.timestamp) else {
                warn!(
                    device_id = %device_id,
                    card_uid = %entry.card_uid,
                    timestamp = %entry.timestamp,
                    "dropping access log with unparseable timestamp"
                );
                dropped_logs += 1;
                continue;
            };

            self.db
                .insert_access_log(
                    &mut tx,
                    &NewAccessLog {
                        device_id: &device_id,
                        card_uid: &entry.card_uid,
                        access_granted: entry.access_granted,
                        access_type: &entry.access_type,
                        user_name: entry.user_name.as_deref(),
                        timestamp: timestamp.timestamp(),
                        session_id: &session_id,
                    },
                )
                .await?;
            ingested_logs += 1;
        }

        let commands = self.queue.lease_in(&mut tx, &device_id).await?;

        tx.commit().await.map_err(StorageError::from)?;

        // Best-effort: the cache is advisory and must never fail the sync.
        self.cache
            .put(
                DeviceStatus {
                    device_id: device_id.clone(),
                    snapshot: upload.current_status.clone(),
                    last_sync: Utc::now(),
                    session_id: session_id.clone(),
                    location: upload.location.as_str().to_string(),
                    spam_detected: upload.spam_detected,
                    total_access_count: upload.total_access_count,
                },
                None,
            )
            .await;

        info!(
            device_id = %device_id,
            session_id = %session_id,
            ingested_logs,
            dropped_logs,
            commands = commands.len(),
            "device sync completed"
        );

        let deliveries: Vec<CommandDelivery> = commands.iter().map(CommandDelivery::from).collect();

        Ok(SyncOutcome {
            response: SyncResponse::new(device_id, session_id, deliveries),
            ingested_logs,
            dropped_logs,
            leased_commands: commands.len(),
            device_created,
        })
    }

    /// Apply a device's acknowledgment batch. Returns the count applied.
    pub async fn acknowledge(&self, upload: AckUpload) -> Result<usize, SyncError> {
        upload.validate().map_err(SyncError::Validation)?;

        let applied = self
            .ack
            .process(&upload.device_id, &upload.command_responses)
            .await;

        info!(
            device_id = %upload.device_id,
            received = upload.command_responses.len(),
            applied,
            "acknowledgment batch processed"
        );

        Ok(applied)
    }

    /// The device's stored status, preferring the cache and repopulating it
    /// on a store hit.
    pub async fn device_status(
        &self,
        device_id: &str,
    ) -> Result<(DeviceStatus, bool), SyncError> {
        if let Some(status) = self.cache.get(device_id).await {
            return Ok((status, true));
        }

        let status = self.registry.status(device_id).await?;
        self.cache.put(status.clone(), None).await;
        Ok((status, false))
    }
}
