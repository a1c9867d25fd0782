//! Drives queue drains on an adaptive cadence.
//!
//! The coordinator owns one Tokio task that sleeps for the current interval,
//! drains the queue, and picks the next interval from the drain summary:
//! the active interval while drains find work, the idle interval after a run
//! of empty drains. Hosts pause it with [`SyncCoordinator::suspend`] when
//! backgrounded and wake it with [`SyncCoordinator::resume`].

mod cadence;
mod coordinator;
mod error;

pub use cadence::{Cadence, CadencePolicy};
pub use coordinator::{CoordinatorConfig, CoordinatorState, SyncCoordinator};
pub use error::{CoordinatorError, CoordinatorResult};
