//! Engine tests.
//!
//! Each module drives a real `SyncQueue` over an in-memory database and a
//! scripted remote.


mod charters;
mod concurrency;
mod retry;
mod scenarios;
