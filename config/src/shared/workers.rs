use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration of the request worker pool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct WorkerPoolConfig {
    /// Maximum number of prompt requests handled at the same time.
    ///
    /// Waiting requests (`WAIT`, `LATCH_WAIT`, `TASK_WAIT`, `CONTEXT_WAIT`) are not counted.
    pub max_concurrent_requests: usize,
}

impl WorkerPoolConfig {
    pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 1024;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent_requests == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "workers.max_concurrent_requests".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: Self::DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}
