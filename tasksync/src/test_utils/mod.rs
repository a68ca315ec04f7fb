//! Helpers shared by unit and integration tests.

pub mod requests;
pub mod store;
pub mod wait;
