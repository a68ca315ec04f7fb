use serde::{Deserialize, Serialize};

use crate::load::Config;
use crate::shared::{ContextConfig, StoreConfig, ValidationError, WorkerPoolConfig};

/// Complete configuration of a coordinator node.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct CoordinatorConfig {
    pub store: StoreConfig,
    pub contexts: ContextConfig,
    pub workers: WorkerPoolConfig,
}

impl CoordinatorConfig {
    /// Validates every section, returning the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.store.validate()?;
        self.contexts.validate()?;
        self.workers.validate()
    }
}

impl Config for CoordinatorConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
