//! Command queue lifecycle tests against an in-memory store.

use chrono::Utc;

use lockhub_commands::{
    AckStatus, CommandError, CommandPayload, CommandQueue, CommandStatus, CommandType, RfidAction,
};
use lockhub_storage::Database;

async fn make_queue() -> CommandQueue {
    let db = Database::open_in_memory().await.unwrap();
    CommandQueue::new(db)
}

#[tokio::test]
async fn test_enqueue_then_lease() {
    let queue = make_queue().await;

    let id = queue
        .enqueue(
            "doorlock_otista_001",
            CommandType::UnlockTimer,
            &CommandPayload::unlock_timer(30),
        )
        .await
        .unwrap();

    let leased = queue.lease("doorlock_otista_001").await.unwrap();
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].command_id, id);
    assert_eq!(leased[0].payload.action(), "unlock");
    assert_eq!(leased[0].payload.duration_minutes(), Some(30));

    let stored = queue.get(&id).await.unwrap();
    assert_eq!(stored.status, CommandStatus::Sent);
    assert!(stored.sent_at.is_some());
}

#[tokio::test]
async fn test_double_lease_returns_same_ids() {
    let queue = make_queue().await;

    for _ in 0..3 {
        queue
            .enqueue(
                "doorlock_otista_001",
                CommandType::RfidControl,
                &CommandPayload::rfid_control(RfidAction::Enable),
            )
            .await
            .unwrap();
    }

    let first: Vec<_> = queue
        .lease("doorlock_otista_001")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.command_id)
        .collect();
    let second: Vec<_> = queue
        .lease("doorlock_otista_001")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.command_id)
        .collect();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_lease_preserves_creation_order() {
    let queue = make_queue().await;

    let first = queue
        .enqueue(
            "doorlock_otista_001",
            CommandType::UnlockTimer,
            &CommandPayload::unlock_timer(10),
        )
        .await
        .unwrap();
    let second = queue
        .enqueue(
            "doorlock_otista_001",
            CommandType::RfidControl,
            &CommandPayload::rfid_control(RfidAction::Disable),
        )
        .await
        .unwrap();

    let leased = queue.lease("doorlock_otista_001").await.unwrap();
    assert_eq!(leased[0].command_id, first);
    assert_eq!(leased[1].command_id, second);
}

#[tokio::test]
async fn test_peek_does_not_transition() {
    let queue = make_queue().await;

    let id = queue
        .enqueue(
            "doorlock_otista_001",
            CommandType::UnlockTimer,
            &CommandPayload::unlock_timer(10),
        )
        .await
        .unwrap();

    let peeked = queue.peek("doorlock_otista_001").await.unwrap();
    assert_eq!(peeked.len(), 1);

    let stored = queue.get(&id).await.unwrap();
    assert_eq!(stored.status, CommandStatus::Queued);
    assert!(stored.sent_at.is_none());
}

#[tokio::test]
async fn test_ack_success_is_terminal() {
    let queue = make_queue().await;

    let id = queue
        .enqueue(
            "doorlock_otista_001",
            CommandType::UnlockTimer,
            &CommandPayload::unlock_timer(30),
        )
        .await
        .unwrap();
    queue.lease("doorlock_otista_001").await.unwrap();

    let executed = Utc::now();
    queue
        .acknowledge(&id, AckStatus::Success, executed)
        .await
        .unwrap();

    let stored = queue.get(&id).await.unwrap();
    assert_eq!(stored.status, CommandStatus::Success);
    assert_eq!(
        stored.executed_at.map(|t| t.timestamp()),
        Some(executed.timestamp())
    );
    assert!(stored.ack_received_at.is_some());

    // A successful command leaves the pending set.
    assert!(queue.lease("doorlock_otista_001").await.unwrap().is_empty());

    // A second ack is a conflict, not a silent overwrite.
    let err = queue
        .acknowledge(&id, AckStatus::Failed, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CommandError::Conflict {
            status: CommandStatus::Success,
            ..
        }
    ));
}

#[tokio::test]
async fn test_ack_unknown_command() {
    let queue = make_queue().await;

    let err = queue
        .acknowledge("cmd_missing", AckStatus::Success, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::NotFound(_)));
}

#[tokio::test]
async fn test_cancel_pending_and_conflict_on_terminal() {
    let queue = make_queue().await;

    let id = queue
        .enqueue(
            "doorlock_otista_001",
            CommandType::RfidControl,
            &CommandPayload::rfid_control(RfidAction::Enable),
        )
        .await
        .unwrap();

    let previous = queue.cancel(&id).await.unwrap();
    assert_eq!(previous, CommandStatus::Queued);
    assert_eq!(queue.get(&id).await.unwrap().status, CommandStatus::Cancelled);

    // Cancelling again reports the terminal state.
    let err = queue.cancel(&id).await.unwrap_err();
    assert!(matches!(
        err,
        CommandError::Conflict {
            status: CommandStatus::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn test_retry_cycle_caps_at_budget() {
    let queue = make_queue().await;
    let device = "doorlock_otista_001";

    let id = queue
        .enqueue(
            device,
            CommandType::UnlockTimer,
            &CommandPayload::unlock_timer(10),
        )
        .await
        .unwrap();

    // failed -> queued three times, then the budget is gone.
    for round in 1..=3u32 {
        queue.lease(device).await.unwrap();
        queue
            .acknowledge(&id, AckStatus::Failed, Utc::now())
            .await
            .unwrap();

        let retried = queue.retry_failed(Some(device), 3).await.unwrap();
        assert_eq!(retried.len(), 1, "round {}", round);

        let stored = queue.get(&id).await.unwrap();
        assert_eq!(stored.status, CommandStatus::Queued);
        assert_eq!(stored.retry_count, round);
        assert!(stored.error_message.is_none());
    }

    queue.lease(device).await.unwrap();
    queue
        .acknowledge(&id, AckStatus::Failed, Utc::now())
        .await
        .unwrap();

    let retried = queue.retry_failed(Some(device), 3).await.unwrap();
    assert!(retried.is_empty());
    assert_eq!(queue.get(&id).await.unwrap().status, CommandStatus::Failed);
}

#[tokio::test]
async fn test_retry_ignores_non_failed() {
    let queue = make_queue().await;
    let device = "doorlock_otista_001";

    let queued = queue
        .enqueue(
            device,
            CommandType::UnlockTimer,
            &CommandPayload::unlock_timer(10),
        )
        .await
        .unwrap();
    let succeeded = queue
        .enqueue(
            device,
            CommandType::RfidControl,
            &CommandPayload::rfid_control(RfidAction::Enable),
        )
        .await
        .unwrap();

    queue.lease(device).await.unwrap();
    queue
        .acknowledge(&succeeded, AckStatus::Success, Utc::now())
        .await
        .unwrap();

    let retried = queue.retry_failed(Some(device), 3).await.unwrap();
    assert!(retried.is_empty());

    // Untouched: the leased command stays sent, the success stays success.
    assert_eq!(queue.get(&queued).await.unwrap().status, CommandStatus::Sent);
    assert_eq!(
        queue.get(&succeeded).await.unwrap().status,
        CommandStatus::Success
    );
}

#[tokio::test]
async fn test_devices_have_independent_queues() {
    let queue = make_queue().await;

    queue
        .enqueue(
            "doorlock_otista_001",
            CommandType::UnlockTimer,
            &CommandPayload::unlock_timer(10),
        )
        .await
        .unwrap();
    let other = queue
        .enqueue(
            "doorlock_kemayoran_002",
            CommandType::RfidControl,
            &CommandPayload::rfid_control(RfidAction::Disable),
        )
        .await
        .unwrap();

    let leased = queue.lease("doorlock_otista_001").await.unwrap();
    assert_eq!(leased.len(), 1);

    // The other device's command was not touched.
    assert_eq!(queue.get(&other).await.unwrap().status, CommandStatus::Queued);
}

#[tokio::test]
async fn test_history_and_pending_views() {
    let queue = make_queue().await;
    let device = "doorlock_otista_001";

    let done = queue
        .enqueue(
            device,
            CommandType::UnlockTimer,
            &CommandPayload::unlock_timer(20),
        )
        .await
        .unwrap();
    queue
        .enqueue(
            device,
            CommandType::RfidControl,
            &CommandPayload::rfid_control(RfidAction::Enable),
        )
        .await
        .unwrap();

    queue.lease(device).await.unwrap();
    queue
        .acknowledge(&done, AckStatus::Success, Utc::now())
        .await
        .unwrap();

    let all = queue.history(device, None, 20).await.unwrap();
    assert_eq!(all.len(), 2);

    let succeeded = queue
        .history(device, Some(CommandStatus::Success), 20)
        .await
        .unwrap();
    assert_eq!(succeeded.len(), 1);
    assert_eq!(succeeded[0].command_id, done);

    let pending = queue.pending_all().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, CommandStatus::Sent);
}
