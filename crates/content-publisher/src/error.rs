use sync_database::{DatabaseError, Visibility};
use sync_queue_engine::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("sign in to share content")]
    NotAuthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("title must be between {min} and {max} characters")]
    InvalidTitle { min: usize, max: usize },

    #[error("description must be at most {max} characters")]
    DescriptionTooLong { max: usize },

    #[error("at most {max} tags are allowed")]
    TooManyTags { max: usize },

    #[error("invalid tag {0:?}")]
    InvalidTag(String),

    #[error("content has nothing to share")]
    EmptyContent,

    #[error("{0:?} is not a publishable visibility")]
    NotPublishable(Visibility),

    #[error("content is not published yet")]
    NotPublished,

    #[error("invalid charter: {0}")]
    InvalidCharter(String),

    #[error("queue error: {0}")]
    Queue(#[from] SyncError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

pub type PublishResult<T> = Result<T, PublishError>;
