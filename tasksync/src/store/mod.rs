//! The distributed store the coordination core runs against.
//!
//! [`base`] defines the interface of the store: observable maps, count-down latches and the
//! task and task-context registries. [`memory`] implements it inside a single process.

mod base;
pub mod memory;

pub use base::*;
