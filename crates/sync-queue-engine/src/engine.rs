//! The sync queue: enqueue side and the drain loop.

use crate::backoff::is_due;
use crate::classify::{classify, RetryDecision};
use crate::handlers::Handlers;
use crate::payload::{
    CharterSnapshot, OperationPayload, PublishPayload, PublishUpdatePayload, UnpublishPayload,
};
use crate::{HandlerError, SyncError, SyncResult};
use chrono::Utc;
use remote_api_client::RemoteApi;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sync_config_and_utils::Config;
use sync_database::{
    ContentRepository, EnqueueEffects, NewSyncOperation, OperationId, OperationKind,
    OperationStatus, OperationStore, SyncOperation, SyncStatus, Visibility,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct SyncQueueConfig {
    /// Failed attempts after which an operation is marked failed.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Spawn a drain right after each enqueue when a Tokio runtime is present.
    pub drain_on_enqueue: bool,
}

impl Default for SyncQueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(300),
            drain_on_enqueue: true,
        }
    }
}

impl From<&Config> for SyncQueueConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base(),
            backoff_max: config.backoff_max(),
            drain_on_enqueue: true,
        }
    }
}

/// Result of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Operations handed to a handler.
    pub attempted: usize,
    pub succeeded: usize,
    /// Failed attempts, plus operations whose retries an earlier drain used
    /// up without managing to mark them failed.
    pub failed: usize,
    /// Operations left alone: still in their backoff window, or cancelled
    /// after the drain fetched them.
    pub skipped: usize,
}

impl SyncSummary {
    /// True when the drain touched no operation.
    pub fn did_work(&self) -> bool {
        self.attempted > 0
    }
}

/// Observable queue state for status badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending_count: u64,
    pub failed_count: u64,
    pub is_syncing: bool,
}

/// Connectivity signal consulted before each drain.
pub trait Reachability: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Reachability stub for hosts without a connectivity signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeReachable;

impl Reachability for AssumeReachable {
    fn is_reachable(&self) -> bool {
        true
    }
}

/// The sync queue engine.
///
/// Cloning is cheap and clones share the in-progress flag and the status
/// channel, so a clone can be moved into a spawned drain.
#[derive(Clone)]
pub struct SyncQueue {
    store: Arc<dyn OperationStore>,
    content: Arc<dyn ContentRepository>,
    remote: Arc<dyn RemoteApi>,
    reachability: Arc<dyn Reachability>,
    config: SyncQueueConfig,
    draining: Arc<AtomicBool>,
    status: Arc<watch::Sender<QueueStatus>>,
}

impl SyncQueue {
    pub fn new(
        store: Arc<dyn OperationStore>,
        content: Arc<dyn ContentRepository>,
        remote: Arc<dyn RemoteApi>,
        config: SyncQueueConfig,
    ) -> Self {
        let (status, _) = watch::channel(QueueStatus::default());
        let queue = Self {
            store,
            content,
            remote,
            reachability: Arc::new(AssumeReachable),
            config,
            draining: Arc::new(AtomicBool::new(false)),
            status: Arc::new(status),
        };
        queue.refresh_status();
        queue
    }

    pub fn with_reachability(mut self, reachability: Arc<dyn Reachability>) -> Self {
        self.reachability = reachability;
        self
    }

    pub fn config(&self) -> &SyncQueueConfig {
        &self.config
    }

    // ==========================================
    // Enqueue
    // ==========================================

    /// Queue a publish of `content_id` at `visibility`.
    ///
    /// The item takes that visibility locally in the same transaction.
    pub fn enqueue_publish(
        &self,
        content_id: &str,
        visibility: Visibility,
        payload: PublishPayload,
    ) -> SyncResult<OperationId> {
        self.enqueue_with_effects(
            content_id,
            visibility,
            OperationPayload::Publish(payload),
            EnqueueEffects {
                visibility: Some(visibility),
                ..EnqueueEffects::default()
            },
        )
    }

    /// Queue removal of published content. Only the public id is captured.
    pub fn enqueue_unpublish(
        &self,
        content_id: &str,
        public_id: Option<String>,
    ) -> SyncResult<OperationId> {
        self.enqueue_with_effects(
            content_id,
            Visibility::Private,
            OperationPayload::Unpublish(UnpublishPayload { public_id }),
            EnqueueEffects {
                visibility: Some(Visibility::Private),
                ..EnqueueEffects::default()
            },
        )
    }

    /// Queue edits for already-published content.
    ///
    /// Supersedes any older pending update for the same item.
    pub fn enqueue_publish_update(
        &self,
        content_id: &str,
        payload: PublishUpdatePayload,
    ) -> SyncResult<OperationId> {
        let item = self
            .content
            .fetch_item(content_id)?
            .ok_or_else(|| SyncError::NotFound(format!("content item {content_id}")))?;
        self.enqueue_with_effects(
            content_id,
            item.visibility,
            OperationPayload::PublishUpdate(payload),
            EnqueueEffects::default(),
        )
    }

    /// Queue a create-or-update of a charter.
    ///
    /// Supersedes any older pending upsert for the same charter.
    pub fn enqueue_charter_upsert(
        &self,
        charter_id: &str,
        snapshot: CharterSnapshot,
    ) -> SyncResult<OperationId> {
        let visibility = snapshot.visibility;
        self.enqueue_with_effects(
            charter_id,
            visibility,
            OperationPayload::CharterUpsert(snapshot),
            EnqueueEffects::default(),
        )
    }

    /// Logically cancel pending operations of `kind` for a content item.
    pub fn cancel_pending(&self, content_id: &str, kind: OperationKind) -> SyncResult<usize> {
        let cancelled = self.store.cancel_pending(content_id, kind)?;
        if cancelled > 0 {
            info!(content_id, kind = kind.as_str(), cancelled, "Cancelled pending operations");
            self.refresh_status();
        }
        Ok(cancelled)
    }

    /// Queue `payload` and apply `effects` to local state in one transaction.
    ///
    /// If the store rejects any part, nothing is queued and the local record
    /// is unchanged. Update and charter snapshots also supersede older
    /// pending snapshots of their kind.
    pub fn enqueue_with_effects(
        &self,
        content_id: &str,
        visibility: Visibility,
        payload: OperationPayload,
        mut effects: EnqueueEffects,
    ) -> SyncResult<OperationId> {
        let kind = payload.kind();
        if matches!(kind, OperationKind::PublishUpdate | OperationKind::CharterUpsert)
            && !effects.cancel_kinds.contains(&kind)
        {
            effects.cancel_kinds.push(kind);
        }

        let receipt = self.store.enqueue_operation(
            NewSyncOperation {
                content_id: content_id.to_string(),
                kind,
                visibility,
                payload: payload.encode()?,
            },
            &effects,
        )?;

        info!(
            operation_id = receipt.operation_id,
            content_id,
            kind = kind.as_str(),
            visibility = visibility.as_str(),
            cancelled = receipt.cancelled,
            "Operation enqueued"
        );

        self.refresh_status();
        self.spawn_drain();
        Ok(receipt.operation_id)
    }

    fn spawn_drain(&self) {
        if !self.config.drain_on_enqueue {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                handle.spawn(async move {
                    queue.process_queue().await;
                });
            }
            Err(_) => debug!("No runtime; drain deferred to the next scheduled run"),
        }
    }

    // ==========================================
    // Status surface
    // ==========================================

    /// Current queue status.
    pub fn status(&self) -> QueueStatus {
        *self.status.borrow()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<QueueStatus> {
        self.status.subscribe()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Recompute pending/failed counts from the store.
    pub fn refresh_status(&self) {
        match self.store.counts_by_status() {
            Ok(counts) => self.status.send_modify(|status| {
                status.pending_count = counts.pending;
                status.failed_count = counts.failed;
            }),
            Err(e) => warn!(error = %e, "Failed to read queue counts"),
        }
    }

    // ==========================================
    // Drain
    // ==========================================

    /// Drain the queue once.
    ///
    /// A call made while another drain runs returns an empty summary at once.
    /// Failures never escape; they are recorded per operation.
    pub async fn process_queue(&self) -> SyncSummary {
        let Some(_guard) = DrainGuard::acquire(self) else {
            debug!("Drain already in progress");
            return SyncSummary::default();
        };

        if !self.reachability.is_reachable() {
            debug!("Network unreachable; skipping drain");
            return SyncSummary::default();
        }

        let mut summary = SyncSummary {
            failed: self.finalize_exhausted(),
            ..SyncSummary::default()
        };

        let pending = match self.store.fetch_pending(self.config.max_retries) {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Failed to fetch pending operations");
                self.refresh_status();
                return summary;
            }
        };

        if !pending.is_empty() {
            debug!(count = pending.len(), "Draining sync queue");
        }

        for fetched in pending {
            let Some(op) = self.still_pending(fetched) else {
                summary.skipped += 1;
                continue;
            };

            if !is_due(
                op.last_attempt_at,
                op.retry_count,
                Utc::now(),
                self.config.backoff_base,
                self.config.backoff_max,
            ) {
                debug!(operation_id = op.id, retry_count = op.retry_count, "Still backing off");
                summary.skipped += 1;
                continue;
            }

            summary.attempted += 1;
            self.set_content_status(&op.content_id, SyncStatus::Syncing);

            let handlers = Handlers {
                remote: self.remote.as_ref(),
                store: self.store.as_ref(),
                content: self.content.as_ref(),
            };
            match handlers.run(&op).await {
                Ok(()) => {
                    self.on_success(&op);
                    summary.succeeded += 1;
                }
                Err(err) => {
                    self.on_failure(&op, err);
                    summary.failed += 1;
                }
            }
        }

        self.refresh_status();

        if summary.did_work() {
            info!(
                attempted = summary.attempted,
                succeeded = summary.succeeded,
                failed = summary.failed,
                skipped = summary.skipped,
                "Drain complete"
            );
        }
        summary
    }

    /// Re-read an operation so one cancelled mid-drain is not executed.
    fn still_pending(&self, fetched: SyncOperation) -> Option<SyncOperation> {
        match self.store.get_operation(fetched.id) {
            Ok(Some(op)) if op.status == OperationStatus::Pending => Some(op),
            Ok(_) => {
                debug!(operation_id = fetched.id, "No longer pending; skipping");
                None
            }
            Err(e) => {
                warn!(operation_id = fetched.id, error = %e, "Failed to re-read operation");
                None
            }
        }
    }

    fn on_success(&self, op: &SyncOperation) {
        match self.store.mark_completed(op.id) {
            Ok(true) => {}
            Ok(false) => {
                // The newer operation that cancelled it owns the record's status.
                info!(
                    operation_id = op.id,
                    content_id = %op.content_id,
                    kind = op.kind.as_str(),
                    "Remote call succeeded but the operation was cancelled meanwhile"
                );
                return;
            }
            Err(e) => {
                warn!(operation_id = op.id, error = %e, "Failed to mark operation completed")
            }
        }
        self.set_content_status(&op.content_id, SyncStatus::Synced);

        match self.store.cancel_duplicates(&op.content_id, op.kind, op.id) {
            Ok(0) => {}
            Ok(cancelled) => {
                debug!(operation_id = op.id, cancelled, "Cancelled duplicate operations")
            }
            Err(e) => warn!(operation_id = op.id, error = %e, "Failed to cancel duplicates"),
        }
    }

    fn on_failure(&self, op: &SyncOperation, err: HandlerError) {
        let message = err.to_string();
        let decision = classify(&err, op.kind, op.retry_count);

        let retry_count = match self.store.increment_retry(op.id, &message) {
            Ok(count) => count,
            Err(e) => {
                warn!(operation_id = op.id, error = %e, "Failed to record attempt; left for next drain");
                self.set_content_status(&op.content_id, SyncStatus::Pending);
                return;
            }
        };

        if decision == RetryDecision::Retry && retry_count < self.config.max_retries {
            warn!(
                operation_id = op.id,
                content_id = %op.content_id,
                kind = op.kind.as_str(),
                retry_count,
                error = %message,
                "Operation failed; will retry"
            );
            self.set_content_status(&op.content_id, SyncStatus::Pending);
            return;
        }

        error!(
            operation_id = op.id,
            content_id = %op.content_id,
            kind = op.kind.as_str(),
            retry_count,
            retryable = decision == RetryDecision::Retry,
            error = %message,
            "Operation failed permanently"
        );
        self.fail_operation(op, &message);
    }

    /// Fail operations whose retries an earlier drain used up without
    /// managing to mark them failed. Returns how many were found.
    fn finalize_exhausted(&self) -> usize {
        let exhausted = match self.store.fetch_exhausted(self.config.max_retries) {
            Ok(exhausted) => exhausted,
            Err(e) => {
                warn!(error = %e, "Failed to fetch exhausted operations");
                return 0;
            }
        };

        for op in &exhausted {
            let message = op
                .last_error
                .clone()
                .unwrap_or_else(|| "retries exhausted".to_string());
            error!(
                operation_id = op.id,
                content_id = %op.content_id,
                kind = op.kind.as_str(),
                retry_count = op.retry_count,
                error = %message,
                "Operation out of retries; marking failed"
            );
            self.fail_operation(op, &message);
        }
        exhausted.len()
    }

    fn fail_operation(&self, op: &SyncOperation, message: &str) {
        if let Err(e) = self.store.mark_failed(op.id, message) {
            warn!(operation_id = op.id, error = %e, "Failed to mark operation failed; left pending for the next drain");
        }
        self.set_content_status(&op.content_id, SyncStatus::Failed);

        if op.kind == OperationKind::Publish {
            match self
                .store
                .cancel_pending(&op.content_id, OperationKind::Unpublish)
            {
                Ok(0) => {}
                Ok(cancelled) => info!(
                    content_id = %op.content_id,
                    cancelled,
                    "Cancelled unpublish after failed publish"
                ),
                Err(e) => warn!(content_id = %op.content_id, error = %e, "Failed to cancel unpublish"),
            }
        }
    }

    fn set_content_status(&self, content_id: &str, status: SyncStatus) {
        if let Err(e) = self.content.set_sync_status(content_id, status) {
            warn!(content_id, status = status.as_str(), error = %e, "Failed to update sync status");
        }
    }
}

/// Holds the in-progress flag for the lifetime of a drain.
struct DrainGuard<'a> {
    queue: &'a SyncQueue,
}

impl<'a> DrainGuard<'a> {
    fn acquire(queue: &'a SyncQueue) -> Option<Self> {
        queue
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        queue.status.send_modify(|status| status.is_syncing = true);
        Some(Self { queue })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.queue.draining.store(false, Ordering::Release);
        self.queue
            .status
            .send_modify(|status| status.is_syncing = false);
    }
}
