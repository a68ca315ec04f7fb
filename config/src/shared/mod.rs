mod base;
mod context;
mod coordinator;
mod store;
mod workers;

pub use base::*;
pub use context::*;
pub use coordinator::*;
pub use store::*;
pub use workers::*;
