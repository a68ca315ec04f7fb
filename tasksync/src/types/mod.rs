mod request;
mod task;

pub use request::*;
pub use task::*;
