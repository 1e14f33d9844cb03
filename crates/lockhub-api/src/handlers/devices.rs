//! Device status and access-log endpoints.

use axum::extract::{Path, Query, State};
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;

use lockhub_devices::{AccessRecord, ConnectionState};

use super::common::{HandlerResult, ok};
use crate::server::ServerState;

/// Query parameters for access-log listing.
#[derive(Debug, Deserialize)]
pub struct LogParams {
    pub limit: Option<i64>,
    pub hours: Option<i64>,
}

/// Status of one device, preferring the cache.
///
/// GET /api/doorlock/status/:device_id
pub async fn device_status_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
) -> HandlerResult<serde_json::Value> {
    let (status, from_cache) = state.coordinator.device_status(&device_id).await?;

    let now = Utc::now();
    ok(json!({
        "device_id": device_id,
        "status": status,
        "sync_age_minutes": status.sync_age_minutes(now),
        "connection_status": status.connection_state(now).as_str(),
        "source": if from_cache { "cache" } else { "database" },
        "timestamp": now.to_rfc3339(),
    }))
}

/// Fleet overview: every active device with connection classification.
///
/// GET /api/doorlock/status
pub async fn fleet_status_handler(
    State(state): State<ServerState>,
) -> HandlerResult<serde_json::Value> {
    let rows = state.registry.fleet().await?;
    let now = Utc::now();

    let mut devices = Vec::with_capacity(rows.len());
    let mut online = 0;
    let mut warning = 0;
    let mut offline = 0;

    for row in rows {
        let last_sync = row
            .last_sync
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        let connection = ConnectionState::classify(last_sync, now);
        match connection {
            ConnectionState::Online => online += 1,
            ConnectionState::Warning => warning += 1,
            ConnectionState::Offline => offline += 1,
        }

        devices.push(json!({
            "device_id": row.device_id,
            "device_name": row.device_name,
            "location": row.location,
            "door_status": row.door_status,
            "rfid_enabled": row.rfid_enabled,
            "battery_percentage": row.battery_percentage,
            "last_sync": last_sync.map(|t| t.to_rfc3339()),
            "connection_status": connection.as_str(),
        }));
    }

    ok(json!({
        "total_devices": devices.len(),
        "online_devices": online,
        "warning_devices": warning,
        "offline_devices": offline,
        "devices": devices,
        "timestamp": now.to_rfc3339(),
    }))
}

/// Recent access logs for a device.
///
/// GET /api/doorlock/logs/:device_id
pub async fn access_logs_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
    Query(params): Query<LogParams>,
) -> HandlerResult<serde_json::Value> {
    let limit = params.limit.unwrap_or(50).clamp(1, 1000);
    let hours = params.hours.unwrap_or(24).clamp(1, 24 * 90);

    let rows = state
        .db
        .recent_access_logs(&device_id, hours, limit)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "access log query failed");
            crate::models::ErrorResponse::service_unavailable("storage unavailable")
        })?;

    let logs: Vec<AccessRecord> = rows.into_iter().map(AccessRecord::from).collect();

    ok(json!({
        "device_id": device_id,
        "logs": logs,
        "count": logs.len(),
        "hours": hours,
        "limit": limit,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
