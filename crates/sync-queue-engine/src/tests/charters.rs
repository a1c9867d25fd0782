//! Charter create-or-update path.

use super::harness::{RemoteCall, TestHarness};
use crate::CharterSnapshot;
use chrono::NaiveDate;
use sync_database::{CharterDraft, OperationStatus, SyncStatus, Visibility};

fn draft(guests: u32) -> CharterDraft {
    CharterDraft {
        id: "charter-1".to_string(),
        name: "Dalmatian coast".to_string(),
        boat_name: Some("Lagoon 42".to_string()),
        destination: "Split".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 6, 13).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 6, 20).unwrap(),
        guests,
        notes: None,
        visibility: Visibility::Public,
    }
}

#[tokio::test]
async fn first_upsert_creates_then_updates() {
    let h = TestHarness::new();
    let charter = h.db.save_charter(&draft(6)).unwrap();

    h.queue
        .enqueue_charter_upsert("charter-1", CharterSnapshot::from_charter(&charter))
        .unwrap();
    assert_eq!(
        h.db.get_charter("charter-1").unwrap().unwrap().sync_status,
        SyncStatus::Queued
    );
    h.queue.process_queue().await;

    let stored = h.db.get_charter("charter-1").unwrap().unwrap();
    assert_eq!(stored.remote_id.as_deref(), Some("remote-charter-1"));
    assert_eq!(stored.sync_status, SyncStatus::Synced);

    let charter = h.db.save_charter(&draft(8)).unwrap();
    h.queue
        .enqueue_charter_upsert("charter-1", CharterSnapshot::from_charter(&charter))
        .unwrap();
    h.queue.process_queue().await;

    assert_eq!(
        h.remote.calls(),
        vec![
            RemoteCall::CreateCharter {
                name: "Dalmatian coast".to_string()
            },
            RemoteCall::UpdateCharter {
                remote_id: "remote-charter-1".to_string(),
                name: "Dalmatian coast".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn upsert_for_deleted_charter_fails() {
    let h = TestHarness::new();
    let charter = h.db.save_charter(&draft(2)).unwrap();
    let mut snapshot = CharterSnapshot::from_charter(&charter);
    snapshot.name = "Gone".to_string();

    let op_id = h.queue.enqueue_charter_upsert("charter-404", snapshot).unwrap();
    h.queue.process_queue().await;

    assert_eq!(h.operation(op_id).status, OperationStatus::Failed);
    assert_eq!(h.remote.call_count(), 0);
}
