use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Retention of task-context and task entries after a context has been cleaned up.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct ContextConfig {
    /// Seconds a cleaned-up context entry stays in the registry before it is evicted.
    pub context_ttl_secs: u64,
    /// Seconds the tasks of a cleaned-up context stay in the registry before they are evicted.
    pub task_ttl_secs: u64,
}

impl ContextConfig {
    pub const DEFAULT_CONTEXT_TTL_SECS: u64 = 300;
    pub const DEFAULT_TASK_TTL_SECS: u64 = 300;

    pub fn context_ttl(&self) -> Duration {
        Duration::from_secs(self.context_ttl_secs)
    }

    pub fn task_ttl(&self) -> Duration {
        Duration::from_secs(self.task_ttl_secs)
    }

    /// Ensures both TTLs are non-zero, a zero TTL would evict entries waiters still observe.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("contexts.context_ttl_secs", self.context_ttl_secs),
            ("contexts.task_ttl_secs", self.task_ttl_secs),
        ] {
            if value == 0 {
                return Err(ValidationError::InvalidFieldValue {
                    field: field.to_string(),
                    constraint: "must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            context_ttl_secs: Self::DEFAULT_CONTEXT_TTL_SECS,
            task_ttl_secs: Self::DEFAULT_TASK_TTL_SECS,
        }
    }
}
