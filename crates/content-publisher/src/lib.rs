//! Producer side of the sync queue.
//!
//! [`ContentPublisher`] turns user actions (publish, unpublish, push an
//! edit, save a charter) into validated local writes plus queue entries.
//! Validation failures are returned to the caller right away and never
//! reach the queue.

mod error;
mod publisher;
mod session;
mod validation;

pub use error::{PublishError, PublishResult};
pub use publisher::{ContentPublisher, Enqueued};
pub use session::{SessionProvider, StaticSession};
pub use validation::{
    generate_public_id, slugify, validate_charter, validate_for_publish, MAX_DESCRIPTION_CHARS,
    MAX_TAGS, MAX_TAG_CHARS, MAX_TITLE_CHARS, MIN_TITLE_CHARS,
};
