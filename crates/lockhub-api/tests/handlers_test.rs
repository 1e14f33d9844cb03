//! Handler-level tests over an in-memory store.

mod common;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;

use lockhub_api::handlers::{basic, commands, devices, sync};
use lockhub_api::models::ErrorResponse;

use common::{create_test_server_state, sync_request};

fn unlock_request(device_id: &str, duration: u32) -> Json<commands::UnlockTimerRequest> {
    Json(
        serde_json::from_value(serde_json::json!({
            "device_id": device_id,
            "duration_minutes": duration,
        }))
        .unwrap(),
    )
}

#[tokio::test]
async fn test_health_handler() {
    let state = create_test_server_state().await;
    let result = basic::health_handler(State(state)).await.unwrap();
    let value = result.0;
    assert_eq!(value["status"], "healthy");
    assert_eq!(value["database"], "connected");
}

#[tokio::test]
async fn test_bulk_upload_then_status() {
    let state = create_test_server_state().await;

    let response = sync::bulk_upload_handler(
        State(state.clone()),
        Json(sync_request("doorlock_otista_001", "s1")),
    )
    .await
    .unwrap();

    assert_eq!(response.0.doorlock.session_ack, "s1");
    assert!(response.0.doorlock.commands.is_empty());

    let status = devices::device_status_handler(
        State(state),
        Path("doorlock_otista_001".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(status.0["source"], "cache");
    assert_eq!(status.0["connection_status"], "online");
}

#[tokio::test]
async fn test_bulk_upload_rejects_bad_device_id() {
    let state = create_test_server_state().await;

    let err = sync::bulk_upload_handler(
        State(state),
        Json(sync_request("fridge_otista_001", "s1")),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status, axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_issue_sync_ack_roundtrip() {
    let state = create_test_server_state().await;
    let device = "doorlock_otista_001";

    // Register the device first; issuance requires an active device.
    sync::bulk_upload_handler(State(state.clone()), Json(sync_request(device, "s0")))
        .await
        .unwrap();

    let issued = commands::unlock_timer_handler(State(state.clone()), unlock_request(device, 30))
        .await
        .unwrap();
    let command_id = issued.0["command_id"].as_str().unwrap().to_string();

    // The next sync delivers the command.
    let response =
        sync::bulk_upload_handler(State(state.clone()), Json(sync_request(device, "s1")))
            .await
            .unwrap();
    let delivered = &response.0.doorlock.commands;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].command_id, command_id);
    assert_eq!(delivered[0].duration_minutes, Some(30));

    // Acknowledge success.
    let ack: lockhub_sync::AckRequest = serde_json::from_value(serde_json::json!({
        "doorlock": {
            "device_id": device,
            "command_responses": [
                {"command_id": command_id, "status": "success", "executed_at": Utc::now().to_rfc3339()}
            ],
            "timestamp": Utc::now().to_rfc3339()
        }
    }))
    .unwrap();
    let result = sync::command_ack_handler(State(state.clone()), Json(ack))
        .await
        .unwrap();
    assert_eq!(result.0["processed_commands"], 1);

    // Status reflects the terminal state.
    let status =
        commands::command_status_handler(State(state), Path(command_id))
            .await
            .unwrap();
    assert_eq!(status.0["command"]["status"], "success");
}

#[tokio::test]
async fn test_unlock_timer_rejects_bad_duration() {
    let state = create_test_server_state().await;
    sync::bulk_upload_handler(
        State(state.clone()),
        Json(sync_request("doorlock_otista_001", "s0")),
    )
    .await
    .unwrap();

    let err = commands::unlock_timer_handler(
        State(state),
        unlock_request("doorlock_otista_001", 45),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unlock_timer_unknown_device_is_404() {
    let state = create_test_server_state().await;

    let err = commands::unlock_timer_handler(
        State(state),
        unlock_request("doorlock_otista_404", 30),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_peek_does_not_lease() {
    let state = create_test_server_state().await;
    let device = "doorlock_otista_001";

    sync::bulk_upload_handler(State(state.clone()), Json(sync_request(device, "s0")))
        .await
        .unwrap();
    commands::unlock_timer_handler(State(state.clone()), unlock_request(device, 10))
        .await
        .unwrap();

    let peeked = commands::peek_commands_handler(State(state.clone()), Path(device.to_string()))
        .await
        .unwrap();
    assert_eq!(peeked.0["count"], 1);

    // Still queued after the peek.
    let pending = commands::pending_commands_handler(State(state)).await.unwrap();
    assert_eq!(pending.0["queued"], 1);
    assert_eq!(pending.0["sent"], 0);
}

#[tokio::test]
async fn test_cancel_conflict_reports_current_status() {
    let state = create_test_server_state().await;
    let device = "doorlock_otista_001";

    sync::bulk_upload_handler(State(state.clone()), Json(sync_request(device, "s0")))
        .await
        .unwrap();
    let issued = commands::unlock_timer_handler(State(state.clone()), unlock_request(device, 10))
        .await
        .unwrap();
    let command_id = issued.0["command_id"].as_str().unwrap().to_string();

    let cancelled =
        commands::cancel_command_handler(State(state.clone()), Path(command_id.clone()))
            .await
            .unwrap();
    assert_eq!(cancelled.0["previous_status"], "queued");

    let err: ErrorResponse = commands::cancel_command_handler(State(state), Path(command_id))
        .await
        .unwrap_err();
    assert_eq!(err.status, axum::http::StatusCode::CONFLICT);
    assert!(err.message.contains("cancelled"));
}

#[tokio::test]
async fn test_fleet_status_counts() {
    let state = create_test_server_state().await;

    sync::bulk_upload_handler(
        State(state.clone()),
        Json(sync_request("doorlock_otista_001", "s1")),
    )
    .await
    .unwrap();
    sync::bulk_upload_handler(
        State(state.clone()),
        Json(sync_request("doorlock_otista_002", "s1")),
    )
    .await
    .unwrap();

    let overview = devices::fleet_status_handler(State(state)).await.unwrap();
    assert_eq!(overview.0["total_devices"], 2);
    assert_eq!(overview.0["online_devices"], 2);
    assert_eq!(overview.0["offline_devices"], 0);
}

#[tokio::test]
async fn test_access_logs_endpoint() {
    let state = create_test_server_state().await;
    let device = "doorlock_otista_001";

    sync::bulk_upload_handler(State(state.clone()), Json(sync_request(device, "s1")))
        .await
        .unwrap();

    let logs = devices::access_logs_handler(
        State(state),
        Path(device.to_string()),
        Query(
            serde_json::from_value::<devices::LogParams>(
                serde_json::json!({"hours": 24 * 90, "limit": 10}),
            )
            .unwrap(),
        ),
    )
    .await
    .unwrap();

    assert_eq!(logs.0["count"], 1);
    assert_eq!(logs.0["logs"][0]["card_uid"], "04a1b2c3");
}

#[tokio::test]
async fn test_statistics_shape() {
    let state = create_test_server_state().await;
    let device = "doorlock_otista_001";

    sync::bulk_upload_handler(State(state.clone()), Json(sync_request(device, "s0")))
        .await
        .unwrap();
    commands::unlock_timer_handler(State(state.clone()), unlock_request(device, 10))
        .await
        .unwrap();

    let stats = commands::command_statistics_handler(
        State(state),
        Query(serde_json::from_value::<commands::StatisticsParams>(serde_json::json!({})).unwrap()),
    )
    .await
    .unwrap();

    assert_eq!(stats.0["total_commands"], 1);
    assert_eq!(stats.0["by_command_type"]["unlock_timer"]["total"], 1);
}
