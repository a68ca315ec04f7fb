use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Settings of the in-process distributed store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct StoreConfig {
    /// Upper bound, in milliseconds, of a single latch await call.
    ///
    /// Longer waits are split into several await calls by the latch wait operation, the same way
    /// a replicated store caps how long one blocking call may hold a member.
    pub latch_max_await_ms: u64,
}

impl StoreConfig {
    /// Default cap of a single latch await: 60 seconds.
    pub const DEFAULT_LATCH_MAX_AWAIT_MS: u64 = 60_000;

    pub fn latch_max_await(&self) -> Duration {
        Duration::from_millis(self.latch_max_await_ms)
    }

    /// Ensures `latch_max_await_ms` is non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.latch_max_await_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "store.latch_max_await_ms".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            latch_max_await_ms: Self::DEFAULT_LATCH_MAX_AWAIT_MS,
        }
    }
}
