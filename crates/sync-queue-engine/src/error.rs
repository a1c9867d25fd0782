//! Sync engine error types.

use remote_api_client::ApiError;
use sync_database::DatabaseError;
use thiserror::Error;

/// Errors surfaced to callers of the enqueue operations.
///
/// Drains never return these; per-operation failures end up in the store
/// and the [`SyncSummary`](crate::SyncSummary).
#[derive(Error, Debug)]
pub enum SyncError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Payload could not be serialized
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// Referenced content item or charter does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;

/// Why a single operation attempt failed.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("remote: {0}")]
    Api(#[from] ApiError),

    /// Stored payload cannot be decoded or does not match its kind.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The local record the operation refers to is gone.
    #[error("missing local record: {0}")]
    MissingContent(String),

    #[error("local store: {0}")]
    Store(#[from] DatabaseError),
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
