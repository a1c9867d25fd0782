use crate::validation::{generate_public_id, validate_charter, validate_content, validate_for_publish};
use crate::{PublishError, PublishResult, SessionProvider};
use std::sync::Arc;
use sync_database::{
    Charter, CharterDraft, ContentItem, Database, EnqueueEffects, OperationId, OperationKind,
    Visibility,
};
use sync_queue_engine::{
    CharterSnapshot, OperationPayload, PublishPayload, PublishUpdatePayload, SyncQueue,
    UnpublishPayload,
};
use tracing::{debug, info};

/// What a user action put on the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    pub public_id: Option<String>,
}

/// Validates user actions and enqueues the matching operations.
pub struct ContentPublisher {
    db: Arc<Database>,
    queue: SyncQueue,
    session: Arc<dyn SessionProvider>,
}

impl ContentPublisher {
    pub fn new(db: Arc<Database>, queue: SyncQueue, session: Arc<dyn SessionProvider>) -> Self {
        Self { db, queue, session }
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// Share `content_id` at `visibility`.
    ///
    /// Content that is already live gets its latest edits pushed instead of
    /// a second publish. A pending unpublish for the item is withdrawn. The
    /// new visibility, the withdrawal and the queued operation commit
    /// together.
    pub fn publish(&self, content_id: &str, visibility: Visibility) -> PublishResult<Enqueued> {
        self.require_session()?;
        let mut item = self.load_item(content_id)?;
        validate_for_publish(&item, visibility)?;

        let effects = EnqueueEffects {
            cancel_kinds: vec![OperationKind::Unpublish],
            visibility: Some(visibility),
        };

        if item.looks_published() {
            item.visibility = visibility;
            return self.enqueue_update(&item, effects);
        }

        let public_id = item
            .public_id
            .clone()
            .unwrap_or_else(|| generate_public_id(&item.title));
        item.visibility = visibility;

        let operation_id = self.queue.enqueue_with_effects(
            content_id,
            visibility,
            OperationPayload::Publish(PublishPayload::from_item(&item, public_id.clone())),
            effects,
        )?;
        info!(operation_id, content_id, %public_id, ?visibility, "Publish requested");
        Ok(Enqueued {
            operation_id,
            kind: OperationKind::Publish,
            public_id: Some(public_id),
        })
    }

    /// Take `content_id` down and make it private locally.
    ///
    /// Pending publish work for the item is cancelled in the same
    /// transaction that queues the unpublish.
    pub fn unpublish(&self, content_id: &str) -> PublishResult<Enqueued> {
        self.require_session()?;
        let item = self.load_item(content_id)?;

        let public_id = item.public_id.clone();
        let operation_id = self.queue.enqueue_with_effects(
            content_id,
            Visibility::Private,
            OperationPayload::Unpublish(UnpublishPayload {
                public_id: public_id.clone(),
            }),
            EnqueueEffects {
                cancel_kinds: vec![OperationKind::Publish, OperationKind::PublishUpdate],
                visibility: Some(Visibility::Private),
            },
        )?;
        info!(operation_id, content_id, public_id = ?public_id, "Unpublish requested");
        Ok(Enqueued {
            operation_id,
            kind: OperationKind::Unpublish,
            public_id,
        })
    }

    /// Send local edits of published content to the backend.
    pub fn push_update(&self, content_id: &str) -> PublishResult<Enqueued> {
        self.require_session()?;
        let item = self.load_item(content_id)?;
        if !item.looks_published() || !item.visibility.is_shared() {
            return Err(PublishError::NotPublished);
        }
        validate_content(&item)?;
        self.enqueue_update(&item, EnqueueEffects::default())
    }

    /// Persist a charter locally and, when signed in, queue its upload.
    pub fn save_charter(&self, draft: &CharterDraft) -> PublishResult<Charter> {
        validate_charter(draft)?;
        let charter = self.db.save_charter(draft)?;

        if !self.session.is_authenticated() {
            debug!(charter_id = %charter.id, "Signed out; charter kept local");
            return Ok(charter);
        }

        let operation_id = self
            .queue
            .enqueue_charter_upsert(&charter.id, CharterSnapshot::from_charter(&charter))?;
        info!(operation_id, charter_id = %charter.id, "Charter sync requested");
        Ok(charter)
    }

    fn enqueue_update(&self, item: &ContentItem, effects: EnqueueEffects) -> PublishResult<Enqueued> {
        let public_id = item.public_id.clone().ok_or(PublishError::NotPublished)?;
        let operation_id = self.queue.enqueue_with_effects(
            &item.id,
            item.visibility,
            OperationPayload::PublishUpdate(PublishUpdatePayload::from_item(item, public_id.clone())),
            effects,
        )?;
        info!(operation_id, content_id = %item.id, %public_id, "Update requested");
        Ok(Enqueued {
            operation_id,
            kind: OperationKind::PublishUpdate,
            public_id: Some(public_id),
        })
    }

    fn require_session(&self) -> PublishResult<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(PublishError::NotAuthenticated)
        }
    }

    fn load_item(&self, content_id: &str) -> PublishResult<ContentItem> {
        self.db
            .get_content_item(content_id)?
            .ok_or_else(|| PublishError::NotFound(format!("content item {content_id}")))
    }
}
