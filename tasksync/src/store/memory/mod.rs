//! Single-process implementation of the distributed store.

mod latch;
mod map;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use config::shared::StoreConfig;
use tracing::info;
use uuid::Uuid;

use crate::contexts::expand_descriptor;
use crate::error::SyncResult;
use crate::store::{
    ClusterStore, EntryListener, ObservableMap, Subscription, TaskContextRegistry,
};
use crate::types::{TaskContextDescriptor, TaskContextEntry, TaskEntry};

pub use latch::MemoryLatch;
pub use map::MemoryMap;

const LATCH_COUNTS_MAP: &str = "latches";
const TASKS_MAP: &str = "tasks";
const TASK_CONTEXTS_MAP: &str = "task_contexts";

/// Task-context registry of a [`MemoryStore`].
///
/// Submission writes the tasks of a context into the task registry before the context itself
/// becomes visible.
#[derive(Debug, Clone)]
pub struct MemoryTaskContexts {
    contexts: MemoryMap<TaskContextEntry>,
    tasks: MemoryMap<TaskEntry>,
}

impl MemoryTaskContexts {
    /// Number of live subscriptions on the registry.
    pub fn listener_count(&self) -> usize {
        self.contexts.listener_count()
    }
}

impl ObservableMap<TaskContextEntry> for MemoryTaskContexts {
    fn name(&self) -> &str {
        self.contexts.name()
    }

    async fn get(&self, key: &str) -> SyncResult<Option<TaskContextEntry>> {
        self.contexts.get(key).await
    }

    async fn put(&self, key: &str, value: TaskContextEntry) -> SyncResult<Option<TaskContextEntry>> {
        self.contexts.put(key, value).await
    }

    async fn put_with_ttl(
        &self,
        key: &str,
        value: TaskContextEntry,
        ttl: Duration,
    ) -> SyncResult<Option<TaskContextEntry>> {
        self.contexts.put_with_ttl(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> SyncResult<Option<TaskContextEntry>> {
        self.contexts.remove(key).await
    }

    async fn subscribe(
        &self,
        key: &str,
        include_value: bool,
        listener: EntryListener<TaskContextEntry>,
    ) -> SyncResult<Subscription> {
        self.contexts.subscribe(key, include_value, listener).await
    }

    async fn destroy(&self) -> SyncResult<()> {
        self.contexts.destroy().await
    }
}

impl TaskContextRegistry for MemoryTaskContexts {
    async fn submit(&self, descriptor: TaskContextDescriptor) -> SyncResult<String> {
        let context_id = Uuid::new_v4().to_string();
        let (context, tasks) = expand_descriptor(descriptor, &context_id)?;

        for task in tasks {
            let task_id = task.id.clone();
            self.tasks.put(&task_id, task).await?;
        }

        info!(
            %context_id,
            name = %context.name,
            tasks = context.contained_tasks.len(),
            "task context submitted"
        );
        self.contexts.put(&context_id, context).await?;

        Ok(context_id)
    }
}

/// In-memory [`ClusterStore`].
///
/// Every clone shares the same maps and latches, so clones handed to different request handlers
/// observe each other's writes like members of one cluster.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    maps: Arc<Mutex<HashMap<String, MemoryMap<String>>>>,
    latch_counts: MemoryMap<u32>,
    tasks: MemoryMap<TaskEntry>,
    task_contexts: MemoryTaskContexts,
    latch_max_await: Duration,
}

impl MemoryStore {
    pub fn new(config: &StoreConfig) -> Self {
        let tasks = MemoryMap::new(TASKS_MAP);

        Self {
            maps: Arc::new(Mutex::new(HashMap::new())),
            latch_counts: MemoryMap::new(LATCH_COUNTS_MAP),
            task_contexts: MemoryTaskContexts {
                contexts: MemoryMap::new(TASK_CONTEXTS_MAP),
                tasks: tasks.clone(),
            },
            tasks,
            latch_max_await: config.latch_max_await(),
        }
    }

    /// Names of the checkpoint maps currently held by the store.
    pub fn map_names(&self) -> Vec<String> {
        self.maps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of live subscriptions on latches, across all latch names.
    pub fn latch_listener_count(&self) -> usize {
        self.latch_counts.listener_count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl ClusterStore for MemoryStore {
    type Map = MemoryMap<String>;
    type Latch = MemoryLatch;
    type Tasks = MemoryMap<TaskEntry>;
    type TaskContexts = MemoryTaskContexts;

    fn map(&self, name: &str) -> MemoryMap<String> {
        let mut maps = self.maps.lock().unwrap_or_else(PoisonError::into_inner);

        maps.entry(name.to_owned())
            .or_insert_with(|| MemoryMap::new(name))
            .clone()
    }

    async fn destroy_map(&self, name: &str) -> SyncResult<()> {
        let removed = self
            .maps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);

        match removed {
            Some(map) => map.destroy().await,
            None => Ok(()),
        }
    }

    fn latch(&self, name: &str) -> MemoryLatch {
        MemoryLatch::new(name, self.latch_counts.clone(), self.latch_max_await)
    }

    fn latch_names(&self) -> Vec<String> {
        self.latch_counts.keys()
    }

    fn tasks(&self) -> MemoryMap<TaskEntry> {
        self.tasks.clone()
    }

    fn task_contexts(&self) -> MemoryTaskContexts {
        self.task_contexts.clone()
    }
}
