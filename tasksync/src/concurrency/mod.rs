//! Concurrency primitives shared by the request workers.

pub mod shutdown;
