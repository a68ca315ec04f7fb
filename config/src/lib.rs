//! Configuration for the task synchronization core.
//!
//! Holds the runtime [`environment::Environment`], the hierarchical loader in [`load`] and the
//! configuration sections shared by the store, the task-context lifecycle and the request
//! worker pool in [`shared`].

pub mod environment;
pub mod load;
pub mod shared;

pub use load::{Config, LoadConfigError, load_config, load_config_from};
