//! Per-kind operation handlers.

use crate::payload::{
    CharterSnapshot, OperationPayload, PublishPayload, PublishUpdatePayload, UnpublishPayload,
};
use crate::HandlerError;
use remote_api_client::{ApiError, RemoteApi};
use sync_database::{
    ContentItem, ContentRepository, OperationKind, OperationStatus, OperationStore, PublicMetadata,
    SyncOperation,
};
use tracing::{debug, info};

/// Borrowed collaborators for one operation attempt.
pub(crate) struct Handlers<'a> {
    pub remote: &'a dyn RemoteApi,
    pub store: &'a dyn OperationStore,
    pub content: &'a dyn ContentRepository,
}

impl Handlers<'_> {
    /// Decode the stored snapshot and run the matching handler.
    pub async fn run(&self, op: &SyncOperation) -> Result<(), HandlerError> {
        let payload = OperationPayload::decode(&op.payload)?;
        if payload.kind() != op.kind {
            return Err(HandlerError::InvalidPayload(format!(
                "payload kind {} does not match operation kind {}",
                payload.kind().as_str(),
                op.kind.as_str()
            )));
        }

        match payload {
            OperationPayload::Publish(payload) => self.publish(op, payload).await,
            OperationPayload::Unpublish(payload) => self.unpublish(op, payload).await,
            OperationPayload::PublishUpdate(payload) => self.publish_update(op, payload).await,
            OperationPayload::CharterUpsert(snapshot) => self.charter_upsert(op, snapshot).await,
        }
    }

    fn ensure_item(&self, content_id: &str) -> Result<(), HandlerError> {
        match self.content.fetch_item(content_id)? {
            Some(_) => Ok(()),
            None => Err(HandlerError::MissingContent(content_id.to_string())),
        }
    }


    async fn publish(&self, op: &SyncOperation, payload: PublishPayload) -> Result<(), HandlerError> {
        self.ensure_item(&op.content_id)?;
        let request = payload.to_request()?;

        let response = self.remote.publish(&request).await?;

        // Local visibility was set at enqueue and may have changed since.
        let found = self.content.attach_public_metadata(
            &op.content_id,
            &PublicMetadata {
                public_id: response.public_id.clone(),
                published_at: response.published_at,
                can_fork: response.can_fork,
                author_username: response.author_username,
            },
        )?;
        require_found(found, &op.content_id)?;

        info!(
            operation_id = op.id,
            content_id = %op.content_id,
            public_id = %response.public_id,
            "Content published"
        );
        Ok(())
    }

    async fn unpublish(
        &self,
        op: &SyncOperation,
        payload: UnpublishPayload,
    ) -> Result<(), HandlerError> {
        let item = self.content.fetch_item(&op.content_id)?;

        let published_before = self
            .store
            .has_successful_operation(&op.content_id, OperationKind::Publish)?;
        let looks_published = item.as_ref().is_some_and(ContentItem::looks_published);
        let public_id = payload
            .public_id
            .or_else(|| item.as_ref().and_then(|i| i.public_id.clone()));

        match public_id {
            Some(public_id) if published_before || looks_published => {
                match self.remote.unpublish(&public_id).await {
                    Ok(()) => {
                        info!(operation_id = op.id, content_id = %op.content_id, %public_id, "Content unpublished");
                    }
                    Err(ApiError::NotFound) => {
                        debug!(operation_id = op.id, %public_id, "Already gone on the server");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            _ => {
                debug!(
                    operation_id = op.id,
                    content_id = %op.content_id,
                    "Never published; skipping remote unpublish"
                );
            }
        }

        // A republish queued meanwhile cancels this operation; its visibility wins.
        let still_wanted = self
            .store
            .get_operation(op.id)?
            .is_some_and(|current| current.status == OperationStatus::Pending);
        self.content
            .clear_public_metadata(&op.content_id, still_wanted)?;
        Ok(())
    }

    async fn publish_update(
        &self,
        op: &SyncOperation,
        payload: PublishUpdatePayload,
    ) -> Result<(), HandlerError> {
        self.ensure_item(&op.content_id)?;
        let request = payload.to_request()?;

        let response = self
            .remote
            .update_published(&payload.public_id, &request)
            .await?;

        let found = self
            .content
            .touch_updated_at(&op.content_id, response.updated_at)?;
        require_found(found, &op.content_id)?;

        info!(
            operation_id = op.id,
            content_id = %op.content_id,
            public_id = %payload.public_id,
            "Published content updated"
        );
        Ok(())
    }

    async fn charter_upsert(
        &self,
        op: &SyncOperation,
        snapshot: CharterSnapshot,
    ) -> Result<(), HandlerError> {
        let remote_id = self
            .content
            .fetch_charter(&op.content_id)?
            .ok_or_else(|| HandlerError::MissingContent(op.content_id.clone()))?
            .remote_id;
        let request = snapshot.to_request();

        let response = match remote_id.as_deref() {
            Some(remote_id) => self.remote.update_charter(remote_id, &request).await?,
            None => self.remote.create_charter(&request).await?,
        };

        let created = remote_id.is_none();
        let found =
            self.content
                .set_charter_remote_id(&op.content_id, &response.id, response.updated_at)?;
        require_found(found, &op.content_id)?;

        info!(
            operation_id = op.id,
            charter_id = %op.content_id,
            remote_id = %response.id,
            created,
            "Charter synced"
        );
        Ok(())
    }
}

/// The record vanished while the remote call was in flight.
fn require_found(found: bool, content_id: &str) -> Result<(), HandlerError> {
    if found {
        Ok(())
    } else {
        Err(HandlerError::MissingContent(content_id.to_string()))
    }
}
