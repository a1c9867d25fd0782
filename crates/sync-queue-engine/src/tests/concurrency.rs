//! Local edits made while a remote call is in flight.
//!
//! The mock remote sleeps before answering; the edit lands during that
//! window and must survive the handler's write-back.

use super::harness::{RemoteCall, TestHarness};
use crate::{CharterSnapshot, PublishUpdatePayload};
use chrono::NaiveDate;
use std::time::Duration;
use sync_database::{CharterDraft, OperationKind, OperationStatus, SyncStatus, Visibility};

const CALL_DELAY: Duration = Duration::from_millis(100);
const EDIT_AFTER: Duration = Duration::from_millis(20);

#[tokio::test]
async fn title_edited_during_publish_is_kept() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Original title");
    h.queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "original-title"))
        .unwrap();
    h.remote.set_delay(CALL_DELAY);

    let (summary, ()) = tokio::join!(h.queue.process_queue(), async {
        tokio::time::sleep(EDIT_AFTER).await;
        h.edit_item("item-1", |item| {
            item.title = "Edited while syncing".to_string();
            item.tags.push("edited".to_string());
        });
    });

    assert_eq!(summary.succeeded, 1);
    let item = h.item("item-1");
    assert_eq!(item.title, "Edited while syncing");
    assert_eq!(item.tags, vec!["sailing".to_string(), "edited".to_string()]);
    assert_eq!(item.public_id.as_deref(), Some("original-title"));
    assert!(item.published_at.is_some());
    assert_eq!(item.author_username.as_deref(), Some("skipper"));
    assert_eq!(item.visibility, Visibility::Public);
    assert_eq!(item.sync_status, SyncStatus::Synced);

    // The request carried the snapshot taken at enqueue.
    assert_eq!(
        h.remote.calls(),
        vec![RemoteCall::Publish {
            public_id: "original-title".to_string(),
            title: "Original title".to_string()
        }]
    );
}

#[tokio::test]
async fn unpublish_requested_during_publish_keeps_item_private() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Docking");
    let publish_id = h
        .queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "docking"))
        .unwrap();
    h.remote.set_delay(CALL_DELAY);

    let (summary, unpublish_id) = tokio::join!(h.queue.process_queue(), async {
        tokio::time::sleep(EDIT_AFTER).await;
        h.queue
            .cancel_pending("item-1", OperationKind::Publish)
            .unwrap();
        h.queue.enqueue_unpublish("item-1", None).unwrap()
    });

    assert_eq!(summary.succeeded, 1);
    // The remote published, but the user's choice stands locally.
    assert_eq!(h.operation(publish_id).status, OperationStatus::Cancelled);
    let item = h.item("item-1");
    assert_eq!(item.visibility, Visibility::Private);
    assert_eq!(item.public_id.as_deref(), Some("docking"));
    assert_eq!(item.sync_status, SyncStatus::Queued);

    // The queued unpublish then takes the server copy down.
    let summary = h.queue.process_queue().await;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(h.operation(unpublish_id).status, OperationStatus::Completed);
    assert_eq!(
        h.remote.calls().last(),
        Some(&RemoteCall::Unpublish {
            public_id: "docking".to_string()
        })
    );
    let item = h.item("item-1");
    assert_eq!(item.visibility, Visibility::Private);
    assert!(item.public_id.is_none());
    assert_eq!(item.sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn republish_during_unpublish_keeps_new_visibility() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Knots");
    h.queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "knots"))
        .unwrap();
    h.queue.process_queue().await;

    h.queue
        .enqueue_unpublish("item-1", Some("knots".to_string()))
        .unwrap();
    h.remote.set_delay(CALL_DELAY);

    let item = h.item("item-1");
    let (_, republish_id) = tokio::join!(h.queue.process_queue(), async {
        tokio::time::sleep(EDIT_AFTER).await;
        h.queue
            .cancel_pending("item-1", OperationKind::Unpublish)
            .unwrap();
        h.queue
            .enqueue_publish("item-1", Visibility::Unlisted, h.publish_payload(&item, "knots-2"))
            .unwrap()
    });

    let item = h.item("item-1");
    assert_eq!(item.visibility, Visibility::Unlisted);
    assert!(item.public_id.is_none());
    assert_eq!(item.sync_status, SyncStatus::Queued);
    assert_eq!(h.operation(republish_id).status, OperationStatus::Pending);
}

#[tokio::test]
async fn description_edited_during_update_is_kept() {
    let h = TestHarness::new();
    let item = h.insert_item("item-1", "Anchoring");
    h.queue
        .enqueue_publish("item-1", Visibility::Public, h.publish_payload(&item, "anchoring"))
        .unwrap();
    h.queue.process_queue().await;

    let item = h.item("item-1");
    h.queue
        .enqueue_publish_update("item-1", PublishUpdatePayload::from_item(&item, "anchoring"))
        .unwrap();
    h.remote.set_delay(CALL_DELAY);

    let (summary, ()) = tokio::join!(h.queue.process_queue(), async {
        tokio::time::sleep(EDIT_AFTER).await;
        h.edit_item("item-1", |item| {
            item.description = "Rewritten offline".to_string();
        });
    });

    assert_eq!(summary.succeeded, 1);
    let item = h.item("item-1");
    assert_eq!(item.description, "Rewritten offline");
    assert_eq!(item.public_id.as_deref(), Some("anchoring"));
    assert_eq!(item.visibility, Visibility::Public);
}

fn charter_draft(name: &str, guests: u32) -> CharterDraft {
    CharterDraft {
        id: "charter-1".to_string(),
        name: name.to_string(),
        boat_name: None,
        destination: "Kornati".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 8, 8).unwrap(),
        guests,
        notes: None,
        visibility: Visibility::Private,
    }
}

#[tokio::test]
async fn charter_edited_during_upsert_is_kept() {
    let h = TestHarness::new();
    let charter = h.db.save_charter(&charter_draft("Kornati week", 4)).unwrap();
    h.queue
        .enqueue_charter_upsert("charter-1", CharterSnapshot::from_charter(&charter))
        .unwrap();
    h.remote.set_delay(CALL_DELAY);

    let (summary, _) = tokio::join!(h.queue.process_queue(), async {
        tokio::time::sleep(EDIT_AFTER).await;
        h.db.save_charter(&charter_draft("Kornati and Zut", 5)).unwrap()
    });

    assert_eq!(summary.succeeded, 1);
    let stored = h.db.get_charter("charter-1").unwrap().unwrap();
    assert_eq!(stored.name, "Kornati and Zut");
    assert_eq!(stored.guests, 5);
    assert_eq!(stored.remote_id.as_deref(), Some("remote-charter-1"));
}
