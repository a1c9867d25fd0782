//! Persistence seams consumed by the sync engine.
//!
//! The engine only sees these traits, so tests can swap in failing or
//! recording stores while production uses [`Database`].

use crate::{
    Charter, ContentItem, Database, DatabaseResult, EnqueueEffects, EnqueueReceipt,
    NewSyncOperation, OperationId, OperationKind, PublicMetadata, StatusCounts, SyncOperation,
    SyncStatus,
};
use chrono::{DateTime, Utc};

/// Persisted operation log.
pub trait OperationStore: Send + Sync {
    /// Append a new pending operation and apply `effects` to the local
    /// record, all or nothing.
    fn enqueue_operation(
        &self,
        op: NewSyncOperation,
        effects: &EnqueueEffects,
    ) -> DatabaseResult<EnqueueReceipt>;

    /// Pending operations with `retry_count < max_retries`, oldest first.
    fn fetch_pending(&self, max_retries: u32) -> DatabaseResult<Vec<SyncOperation>>;

    /// Pending operations with `retry_count >= max_retries`, left behind
    /// when marking them failed did not go through.
    fn fetch_exhausted(&self, max_retries: u32) -> DatabaseResult<Vec<SyncOperation>>;

    fn get_operation(&self, id: OperationId) -> DatabaseResult<Option<SyncOperation>>;

    /// Complete a pending operation; false if it was no longer pending.
    fn mark_completed(&self, id: OperationId) -> DatabaseResult<bool>;

    /// Record a failed attempt; returns the new retry count.
    fn increment_retry(&self, id: OperationId, error: &str) -> DatabaseResult<u32>;

    fn mark_failed(&self, id: OperationId, error: &str) -> DatabaseResult<()>;

    /// Cancel all pending operations of `kind` for `content_id`.
    fn cancel_pending(&self, content_id: &str, kind: OperationKind) -> DatabaseResult<usize>;

    /// Cancel pending operations of `kind` for `content_id` other than `excluding`.
    fn cancel_duplicates(
        &self,
        content_id: &str,
        kind: OperationKind,
        excluding: OperationId,
    ) -> DatabaseResult<usize>;

    fn counts_by_status(&self) -> DatabaseResult<StatusCounts>;

    fn has_successful_operation(&self, content_id: &str, kind: OperationKind)
        -> DatabaseResult<bool>;
}

/// Local content and charter records touched by sync handlers.
///
/// Writes only cover server-owned fields, so edits the user makes while a
/// remote call is in flight survive the handler. Each write returns false
/// when no record matched.
pub trait ContentRepository: Send + Sync {
    fn fetch_item(&self, id: &str) -> DatabaseResult<Option<ContentItem>>;

    fn attach_public_metadata(&self, id: &str, metadata: &PublicMetadata) -> DatabaseResult<bool>;

    /// Drop public metadata; `make_private` also reverts visibility.
    fn clear_public_metadata(&self, id: &str, make_private: bool) -> DatabaseResult<bool>;

    fn touch_updated_at(&self, id: &str, updated_at: DateTime<Utc>) -> DatabaseResult<bool>;

    /// Project a sync status onto a content item or charter.
    fn set_sync_status(&self, id: &str, status: SyncStatus) -> DatabaseResult<()>;

    fn fetch_charter(&self, id: &str) -> DatabaseResult<Option<Charter>>;

    fn set_charter_remote_id(
        &self,
        id: &str,
        remote_id: &str,
        updated_at: Option<DateTime<Utc>>,
    ) -> DatabaseResult<bool>;
}

impl OperationStore for Database {
    fn enqueue_operation(
        &self,
        op: NewSyncOperation,
        effects: &EnqueueEffects,
    ) -> DatabaseResult<EnqueueReceipt> {
        self.enqueue_sync_operation(&op, effects)
    }

    fn fetch_pending(&self, max_retries: u32) -> DatabaseResult<Vec<SyncOperation>> {
        self.get_pending_sync_operations(max_retries)
    }

    fn fetch_exhausted(&self, max_retries: u32) -> DatabaseResult<Vec<SyncOperation>> {
        self.get_exhausted_sync_operations(max_retries)
    }

    fn get_operation(&self, id: OperationId) -> DatabaseResult<Option<SyncOperation>> {
        self.get_sync_operation(id)
    }

    fn mark_completed(&self, id: OperationId) -> DatabaseResult<bool> {
        self.mark_sync_operation_completed(id)
    }

    fn increment_retry(&self, id: OperationId, error: &str) -> DatabaseResult<u32> {
        self.record_sync_operation_failure(id, error)
    }

    fn mark_failed(&self, id: OperationId, error: &str) -> DatabaseResult<()> {
        self.mark_sync_operation_failed(id, error)
    }

    fn cancel_pending(&self, content_id: &str, kind: OperationKind) -> DatabaseResult<usize> {
        self.cancel_pending_sync_operations(content_id, kind)
    }

    fn cancel_duplicates(
        &self,
        content_id: &str,
        kind: OperationKind,
        excluding: OperationId,
    ) -> DatabaseResult<usize> {
        self.cancel_duplicate_sync_operations(content_id, kind, excluding)
    }

    fn counts_by_status(&self) -> DatabaseResult<StatusCounts> {
        self.sync_operation_counts()
    }

    fn has_successful_operation(
        &self,
        content_id: &str,
        kind: OperationKind,
    ) -> DatabaseResult<bool> {
        self.has_completed_sync_operation(content_id, kind)
    }
}

impl ContentRepository for Database {
    fn fetch_item(&self, id: &str) -> DatabaseResult<Option<ContentItem>> {
        self.get_content_item(id)
    }

    fn attach_public_metadata(&self, id: &str, metadata: &PublicMetadata) -> DatabaseResult<bool> {
        self.set_public_metadata(id, metadata)
    }

    fn clear_public_metadata(&self, id: &str, make_private: bool) -> DatabaseResult<bool> {
        Database::clear_public_metadata(self, id, make_private)
    }

    fn touch_updated_at(&self, id: &str, updated_at: DateTime<Utc>) -> DatabaseResult<bool> {
        self.touch_content_item(id, updated_at)
    }

    fn set_sync_status(&self, id: &str, status: SyncStatus) -> DatabaseResult<()> {
        // Content items and charters share one id space from the engine's view.
        if !self.set_content_sync_status(id, status)? {
            self.set_charter_sync_status(id, status)?;
        }
        Ok(())
    }

    fn fetch_charter(&self, id: &str) -> DatabaseResult<Option<Charter>> {
        self.get_charter(id)
    }

    fn set_charter_remote_id(
        &self,
        id: &str,
        remote_id: &str,
        updated_at: Option<DateTime<Utc>>,
    ) -> DatabaseResult<bool> {
        Database::set_charter_remote_id(self, id, remote_id, updated_at)
    }
}
