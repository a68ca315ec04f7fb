//! Execution of requests on the Tokio runtime.

mod pool;

pub use pool::{PendingRequest, ReplyHandle, RequestWorkerPool};
