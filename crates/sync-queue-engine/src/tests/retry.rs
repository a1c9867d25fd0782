//! Retry bound, classification and backoff in the drain loop.

use super::harness::{offline, test_config, TestHarness};
use crate::SyncQueueConfig;
use remote_api_client::ApiError;
use std::time::Duration;
use sync_database::{OperationStatus, SyncStatus, Visibility};

#[tokio::test]
async fn retryable_failure_reaches_failed_after_max_retries() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Heavy weather");
    let op_id = h
        .queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "heavy"))
        .unwrap();
    h.remote.fail_always(Some(ApiError::ServerError(503)));

    for expected_retries in 1..=2 {
        let summary = h.queue.process_queue().await;
        assert_eq!(summary.failed, 1);
        let op = h.operation(op_id);
        assert_eq!(op.status, OperationStatus::Pending);
        assert_eq!(op.retry_count, expected_retries);
        assert_eq!(h.item("item-1").sync_status, SyncStatus::Pending);
    }

    h.queue.process_queue().await;
    let op = h.operation(op_id);
    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(op.retry_count, 3);
    assert_eq!(op.last_error.as_deref(), Some("remote: server error: HTTP 503"));
    assert_eq!(h.item("item-1").sync_status, SyncStatus::Failed);

    // Never attempted again.
    let summary = h.queue.process_queue().await;
    assert!(!summary.did_work());
    assert_eq!(h.remote.call_count(), 3);
    assert_eq!(h.queue.status().failed_count, 1);
}

#[tokio::test]
async fn unauthorized_is_terminal_on_first_attempt() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Crew briefing");
    let op_id = h
        .queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "crew"))
        .unwrap();
    h.remote.fail_next(ApiError::Unauthorized);

    let summary = h.queue.process_queue().await;
    assert_eq!(summary.failed, 1);

    let op = h.operation(op_id);
    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(op.retry_count, 1);
    assert_eq!(h.item("item-1").sync_status, SyncStatus::Failed);
}

#[tokio::test]
async fn unknown_error_is_retried_once() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Sail plan");
    let op_id = h
        .queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "sail-plan"))
        .unwrap();
    h.remote
        .fail_always(Some(ApiError::InvalidResponse("unexpected html".into())));

    h.queue.process_queue().await;
    assert_eq!(h.operation(op_id).status, OperationStatus::Pending);

    h.queue.process_queue().await;
    let op = h.operation(op_id);
    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(op.retry_count, 2);
    assert_eq!(h.remote.call_count(), 2);
}

#[tokio::test]
async fn transient_failure_then_success() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Tides");
    let op_id = h
        .queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "tides"))
        .unwrap();
    h.remote.fail_next(offline());

    h.queue.process_queue().await;
    assert_eq!(h.item("item-1").sync_status, SyncStatus::Pending);

    let summary = h.queue.process_queue().await;
    assert_eq!(summary.succeeded, 1);
    let op = h.operation(op_id);
    assert_eq!(op.status, OperationStatus::Completed);
    assert_eq!(op.retry_count, 1);
    assert_eq!(h.item("item-1").sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn backoff_window_skips_operation() {
    let h = TestHarness::with_config(SyncQueueConfig {
        backoff_base: Duration::from_secs(60),
        backoff_max: Duration::from_secs(600),
        ..test_config()
    });
    let item = h.insert_item("item-1", "Mooring");
    let op_id = h
        .queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "mooring"))
        .unwrap();
    h.remote.fail_next(offline());

    assert_eq!(h.queue.process_queue().await.failed, 1);

    let summary = h.queue.process_queue().await;
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(h.operation(op_id).retry_count, 1);
    assert_eq!(h.remote.call_count(), 1);
}

#[tokio::test]
async fn store_failure_while_recording_attempt_leaves_operation_pending() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Fuel log");
    let op_id = h
        .queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "fuel"))
        .unwrap();
    h.remote.fail_next(ApiError::Conflict);
    h.store.set_fail_increment(true);

    let summary = h.queue.process_queue().await;
    assert_eq!(summary.failed, 1);
    let op = h.operation(op_id);
    assert_eq!(op.status, OperationStatus::Pending);
    assert_eq!(op.retry_count, 0);

    h.store.set_fail_increment(false);
    assert_eq!(h.queue.process_queue().await.succeeded, 1);
}

#[tokio::test]
async fn missing_content_is_terminal() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Ghost");
    let payload = h.publish_payload(&item, "ghost");
    let op_id = h
        .queue
        .enqueue_publish("deleted-item", Visibility::Public, payload)
        .unwrap();

    h.queue.process_queue().await;
    let op = h.operation(op_id);
    assert_eq!(op.status, OperationStatus::Failed);
    assert!(op.last_error.unwrap().contains("deleted-item"));
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn exhausted_operation_left_pending_is_failed_by_next_drain() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Bilge pumps");
    let op_id = h
        .queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "bilge"))
        .unwrap();
    h.remote.fail_always(Some(ApiError::ServerError(503)));
    h.store.set_fail_mark_failed(true);

    for _ in 0..3 {
        h.queue.process_queue().await;
    }
    let op = h.operation(op_id);
    assert_eq!(op.status, OperationStatus::Pending);
    assert_eq!(op.retry_count, 3);

    h.store.set_fail_mark_failed(false);
    let summary = h.queue.process_queue().await;

    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(h.remote.call_count(), 3);
    let op = h.operation(op_id);
    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(op.last_error.as_deref(), Some("remote: server error: HTTP 503"));
    assert_eq!(h.item("item-1").sync_status, SyncStatus::Failed);
    let status = h.queue.status();
    assert_eq!(status.pending_count, 0);
    assert_eq!(status.failed_count, 1);
}
