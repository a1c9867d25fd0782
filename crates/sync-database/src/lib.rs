//! SQLite persistence for the Anchorline sync core.
//!
//! This crate provides:
//! - Database migrations
//! - Model types for content items, charters and sync operations
//! - The `OperationStore` and `ContentRepository` traits consumed by the
//!   sync engine, implemented by [`Database`]
//!
//! All access goes through one connection guarded by a mutex; SQLite
//! serializes writes anyway and the queue has a single logical owner.

mod db;
mod error;
mod migrations;
mod models;
mod operations;
mod traits;

pub use db::Database;
pub use error::{DatabaseError, DatabaseResult};
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::*;
pub use traits::{ContentRepository, OperationStore};
