//! Device-facing sync endpoints: bulk upload and command acknowledgment.

use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::json;

use lockhub_sync::{AckRequest, SyncRequest, SyncResponse};

use super::common::{HandlerResult, ok};
use crate::server::ServerState;

/// Handle a device check-in: ingest status and buffered access logs, lease
/// pending commands, return them with the session acknowledgment.
///
/// POST /api/doorlock/bulk-upload
pub async fn bulk_upload_handler(
    State(state): State<ServerState>,
    Json(request): Json<SyncRequest>,
) -> HandlerResult<SyncResponse> {
    let outcome = state.coordinator.sync(request.doorlock).await?;
    ok(outcome.response)
}

/// Handle a batch of command execution acknowledgments.
///
/// POST /api/doorlock/command-ack
pub async fn command_ack_handler(
    State(state): State<ServerState>,
    Json(request): Json<AckRequest>,
) -> HandlerResult<serde_json::Value> {
    let device_id = request.doorlock.device_id.clone();
    let received = request.doorlock.command_responses.len();
    let applied = state.coordinator.acknowledge(request.doorlock).await?;

    ok(json!({
        "message": "Command acknowledgments received",
        "device_id": device_id,
        "received": received,
        "processed_commands": applied,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
