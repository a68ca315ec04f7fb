//! Synchronization core of a distributed task-execution platform.
//!
//! Tasks running on different nodes coordinate through checkpoints, count-down latches and
//! completion waits on tasks and task contexts. A decoded [`types::Request`] is routed by the
//! [`actions::ActionDispatcher`] to its action, which runs against a [`store::ClusterStore`] and
//! produces exactly one [`types::Reply`]. Waits are built on [`rendezvous::rendezvous`], which
//! never misses a change that races with the start of the wait.

pub mod actions;
pub mod concurrency;
pub mod contexts;
pub mod error;
mod macros;
pub mod names;
pub mod rendezvous;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;
