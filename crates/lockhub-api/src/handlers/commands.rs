//! Operator-facing command endpoints.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use lockhub_commands::{CommandPayload, CommandStatus, CommandType, RfidAction};
use lockhub_core::config::commands as command_config;
use lockhub_core::validate_device_id;
use lockhub_sync::CommandDelivery;

use super::common::{HandlerResult, ok};
use crate::models::ErrorResponse;
use crate::server::ServerState;

/// Unlock-timer issuance request.
#[derive(Debug, Deserialize)]
pub struct UnlockTimerRequest {
    pub device_id: String,
    pub duration_minutes: u32,
}

/// RFID control issuance request.
#[derive(Debug, Deserialize)]
pub struct RfidControlRequest {
    pub device_id: String,
    pub action: String,
}

/// Bulk retry request.
#[derive(Debug, Default, Deserialize)]
pub struct RetryFailedRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// Query parameters for command history.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// Query parameters for command statistics.
#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
    pub hours: Option<i64>,
}

/// Issue an unlock-timer command.
///
/// POST /api/doorlock/command/unlock-timer
pub async fn unlock_timer_handler(
    State(state): State<ServerState>,
    Json(request): Json<UnlockTimerRequest>,
) -> HandlerResult<serde_json::Value> {
    validate_device_id(&request.device_id)
        .map_err(|e| ErrorResponse::validation(e.to_string()))?;

    if !command_config::UNLOCK_DURATIONS_MIN.contains(&request.duration_minutes) {
        return Err(ErrorResponse::bad_request(format!(
            "duration must be one of {:?} minutes",
            command_config::UNLOCK_DURATIONS_MIN
        )));
    }

    state.registry.require_active(&request.device_id).await?;

    let command_id = state
        .queue
        .enqueue(
            &request.device_id,
            CommandType::UnlockTimer,
            &CommandPayload::unlock_timer(request.duration_minutes),
        )
        .await?;

    ok(json!({
        "message": format!("Unlock timer command queued for {}", request.device_id),
        "command_id": command_id,
        "device_id": request.device_id,
        "duration_minutes": request.duration_minutes,
        "estimated_delivery": "next device sync",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Issue an RFID enable/disable command.
///
/// POST /api/doorlock/command/rfid-control
pub async fn rfid_control_handler(
    State(state): State<ServerState>,
    Json(request): Json<RfidControlRequest>,
) -> HandlerResult<serde_json::Value> {
    validate_device_id(&request.device_id)
        .map_err(|e| ErrorResponse::validation(e.to_string()))?;

    let action = RfidAction::parse(&request.action).ok_or_else(|| {
        ErrorResponse::bad_request("action must be 'enable' or 'disable'")
    })?;

    state.registry.require_active(&request.device_id).await?;

    let command_id = state
        .queue
        .enqueue(
            &request.device_id,
            CommandType::RfidControl,
            &CommandPayload::rfid_control(action),
        )
        .await?;

    ok(json!({
        "message": format!("RFID {} command queued for {}", action.as_str(), request.device_id),
        "command_id": command_id,
        "device_id": request.device_id,
        "action": action.as_str(),
        "estimated_delivery": "next device sync",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Full record for one command.
///
/// GET /api/doorlock/command/status/:command_id
pub async fn command_status_handler(
    State(state): State<ServerState>,
    Path(command_id): Path<String>,
) -> HandlerResult<serde_json::Value> {
    let record = state.queue.get(&command_id).await?;

    ok(json!({
        "command": record,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Peek a device's pending commands without leasing them.
///
/// GET /api/doorlock/commands/:device_id
pub async fn peek_commands_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
) -> HandlerResult<serde_json::Value> {
    let pending = state.queue.peek(&device_id).await?;
    let commands: Vec<CommandDelivery> = pending.iter().map(CommandDelivery::from).collect();

    ok(json!({
        "device_id": device_id,
        "commands": commands,
        "count": commands.len(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Command history for a device.
///
/// GET /api/doorlock/commands/:device_id/history
pub async fn command_history_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> HandlerResult<serde_json::Value> {
    let status = match params.status.as_deref() {
        Some(s) => Some(CommandStatus::parse(s).ok_or_else(|| {
            ErrorResponse::bad_request(format!("unknown status filter: {}", s))
        })?),
        None => None,
    };
    let limit = params.limit.unwrap_or(20).clamp(1, 500);

    let commands = state.queue.history(&device_id, status, limit).await?;

    ok(json!({
        "device_id": device_id,
        "commands": commands,
        "count": commands.len(),
        "filter_status": params.status,
        "limit": limit,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Pending commands across all devices.
///
/// GET /api/doorlock/commands/pending
pub async fn pending_commands_handler(
    State(state): State<ServerState>,
) -> HandlerResult<serde_json::Value> {
    let pending = state.queue.pending_all().await?;

    let queued = pending
        .iter()
        .filter(|c| c.status == CommandStatus::Queued)
        .count();
    let sent = pending.len() - queued;

    ok(json!({
        "pending_commands": pending,
        "total_pending": pending.len(),
        "queued": queued,
        "sent": sent,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Command execution statistics over the trailing window.
///
/// GET /api/doorlock/commands/statistics
pub async fn command_statistics_handler(
    State(state): State<ServerState>,
    Query(params): Query<StatisticsParams>,
) -> HandlerResult<serde_json::Value> {
    let hours = params.hours.unwrap_or(24).clamp(1, 24 * 30);
    let buckets = state.queue.statistics(hours).await?;

    #[derive(Default)]
    struct TypeStats {
        total: i64,
        by_status: BTreeMap<String, i64>,
        avg_execution_secs: Option<f64>,
    }

    let mut per_type: BTreeMap<String, TypeStats> = BTreeMap::new();
    let mut total_commands = 0;

    for bucket in buckets {
        let entry = per_type.entry(bucket.command_type.clone()).or_default();
        entry.total += bucket.count;
        entry.by_status.insert(bucket.status.clone(), bucket.count);
        if bucket.status == "success" {
            entry.avg_execution_secs = bucket.avg_execution_secs;
        }
        total_commands += bucket.count;
    }

    let by_command_type: serde_json::Map<String, serde_json::Value> = per_type
        .into_iter()
        .map(|(command_type, stats)| {
            let success = stats.by_status.get("success").copied().unwrap_or(0);
            let success_rate = if stats.total > 0 {
                (success as f64 / stats.total as f64 * 1000.0).round() / 10.0
            } else {
                0.0
            };
            (
                command_type,
                json!({
                    "total": stats.total,
                    "by_status": stats.by_status,
                    "success_rate": success_rate,
                    "avg_execution_secs": stats.avg_execution_secs,
                }),
            )
        })
        .collect();

    ok(json!({
        "period_hours": hours,
        "total_commands": total_commands,
        "by_command_type": by_command_type,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Re-queue failed commands with remaining retry budget.
///
/// POST /api/doorlock/commands/retry-failed
pub async fn retry_failed_handler(
    State(state): State<ServerState>,
    request: Option<Json<RetryFailedRequest>>,
) -> HandlerResult<serde_json::Value> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let max_retries = request
        .max_retries
        .unwrap_or(command_config::DEFAULT_MAX_RETRIES);

    if let Some(device_id) = request.device_id.as_deref() {
        state.registry.require_active(device_id).await?;
    }

    let retried = state
        .queue
        .retry_failed(request.device_id.as_deref(), max_retries)
        .await?;

    ok(json!({
        "message": format!("Retried {} failed commands", retried.len()),
        "device_id": request.device_id,
        "retried_commands": retried,
        "count": retried.len(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Cancel a pending command.
///
/// DELETE /api/doorlock/command/:command_id
pub async fn cancel_command_handler(
    State(state): State<ServerState>,
    Path(command_id): Path<String>,
) -> HandlerResult<serde_json::Value> {
    let previous = state.queue.cancel(&command_id).await?;

    ok(json!({
        "message": format!("Command {} cancelled", command_id),
        "command_id": command_id,
        "previous_status": previous.as_str(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
