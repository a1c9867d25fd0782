//! # Sync queue engine
//!
//! Reconciles locally edited content with the remote backend through a
//! persisted operation log.
//!
//! ```text
//! ┌──────────────┐  enqueue   ┌──────────────────┐  drain   ┌─────────────┐
//! │  Publisher   │───────────▶│ sync_operations  │─────────▶│  RemoteApi  │
//! └──────────────┘            │    (SQLite)      │          └─────────────┘
//!                             └──────────────────┘
//!                                      │ status
//!                                      ▼
//!                              content sync status
//! ```
//!
//! - **Enqueue** writes the operation, any cancellations it implies and the
//!   item's new local state in one transaction; it never waits on the
//!   network.
//! - **Drain** ([`SyncQueue::process_queue`]) runs at most once at a time,
//!   processes pending operations oldest first, and classifies each failure
//!   as retryable or terminal. Handlers write back only server-owned fields.
//! - **Status** is published on a `watch` channel for badges.

mod backoff;
mod classify;
mod engine;
mod error;
mod handlers;
mod payload;

pub use backoff::{compute_backoff, is_due};
pub use classify::{classify, RetryDecision};
pub use engine::{AssumeReachable, QueueStatus, Reachability, SyncQueue, SyncQueueConfig, SyncSummary};
pub use error::{HandlerError, SyncError, SyncResult};
pub use payload::{
    CharterSnapshot, OperationPayload, PublishPayload, PublishUpdatePayload, UnpublishPayload,
};

#[cfg(test)]
mod tests;
