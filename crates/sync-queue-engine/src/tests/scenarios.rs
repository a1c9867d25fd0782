//! End-to-end scenarios for the publish flow.

use super::harness::{offline, TestHarness};
use chrono::Utc;
use remote_api_client::{ApiError, PublishResponse};
use sync_database::{OperationStatus, SyncStatus, Visibility};

#[tokio::test]
async fn pre_departure_checkin_is_published() {
    let h = TestHarness::new();
    let item = h.insert_item("checklist-a", "Pre-Departure Checkin");
    h.remote.queue_publish_response(PublishResponse {
        id: "srv-42".to_string(),
        public_id: "pre-departure-checkin-ab12cd34".to_string(),
        published_at: Utc::now(),
        author_username: Some("captain".to_string()),
        can_fork: true,
    });

    h.queue
        .enqueue_publish(
            "checklist-a",
            Visibility::Public,
            h.publish_payload(&item, "pre-departure-checkin-ab12cd34"),
        )
        .unwrap();
    h.queue.process_queue().await;

    let item = h.item("checklist-a");
    assert_eq!(item.sync_status, SyncStatus::Synced);
    assert_eq!(
        item.public_id.as_deref(),
        Some("pre-departure-checkin-ab12cd34")
    );
    assert!(item.can_fork);
    assert_eq!(item.author_username.as_deref(), Some("captain"));
}

#[tokio::test]
async fn conflict_on_publish_fails_without_retry() {
    let h = TestHarness::new();
    let item = h.insert_item("checklist-a", "Pre-Departure Checkin");
    let op_id = h
        .queue
        .enqueue_publish(
            "checklist-a",
            Visibility::Public,
            h.publish_payload(&item, "pre-departure-checkin-ab12cd34"),
        )
        .unwrap();
    h.remote.fail_next(ApiError::Conflict);

    let summary = h.queue.process_queue().await;
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.failed, 1);

    assert_eq!(h.operation(op_id).status, OperationStatus::Failed);
    assert_eq!(h.item("checklist-a").sync_status, SyncStatus::Failed);

    h.queue.process_queue().await;
    assert_eq!(h.remote.call_count(), 1);
}

#[tokio::test]
async fn three_network_errors_exhaust_retries() {
    let h = TestHarness::new();
    let item = h.insert_item("checklist-a", "Pre-Departure Checkin");
    let op_id = h
        .queue
        .enqueue_publish(
            "checklist-a",
            Visibility::Public,
            h.publish_payload(&item, "pre-departure-checkin-ab12cd34"),
        )
        .unwrap();
    for _ in 0..3 {
        h.remote.fail_next(offline());
    }

    let mut statuses = vec![h.item("checklist-a").sync_status];
    for _ in 0..3 {
        h.queue.process_queue().await;
        statuses.push(h.item("checklist-a").sync_status);
    }

    assert_eq!(
        statuses,
        vec![
            SyncStatus::Queued,
            SyncStatus::Pending,
            SyncStatus::Pending,
            SyncStatus::Failed
        ]
    );
    let op = h.operation(op_id);
    assert_eq!(op.retry_count, 3);
    assert_eq!(op.status, OperationStatus::Failed);
}
