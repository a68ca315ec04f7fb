use std::time::Duration;

use config::shared::StoreConfig;

use crate::error::SyncResult;
use crate::store::memory::{MemoryLatch, MemoryMap, MemoryStore, MemoryTaskContexts};
use crate::store::{ClusterStore, EntryListener, ObservableMap, Subscription};
use crate::types::{TaskContextEntry, TaskContextState, TaskEntry, TaskState};

/// Creates a [`MemoryStore`] with the default configuration.
pub fn memory_store() -> MemoryStore {
    MemoryStore::default()
}

/// Creates a [`MemoryStore`] whose latch awaits return after at most `latch_max_await_ms`.
pub fn memory_store_with_latch_await(latch_max_await_ms: u64) -> MemoryStore {
    MemoryStore::new(&StoreConfig { latch_max_await_ms })
}

/// Writes a task entry in state `state` directly into the task registry.
pub async fn put_task(store: &MemoryStore, task_id: &str, context_id: &str, state: TaskState) {
    let task = TaskEntry {
        id: task_id.to_owned(),
        context_id: context_id.to_owned(),
        name: task_id.to_owned(),
        state,
        properties: Default::default(),
    };

    store
        .tasks()
        .put(task_id, task)
        .await
        .expect("failed to write task entry");
}

/// Writes a task-context entry in state `state` directly into the task-context registry.
pub async fn put_context(store: &MemoryStore, context_id: &str, state: TaskContextState) {
    let context = TaskContextEntry {
        id: context_id.to_owned(),
        name: context_id.to_owned(),
        state,
        contained_tasks: Vec::new(),
    };

    store
        .task_contexts()
        .put(context_id, context)
        .await
        .expect("failed to write task context entry");
}

/// Map whose reads never see an entry, like a replica that has not caught up yet with the
/// writes its listeners are already notified of.
#[derive(Debug, Clone)]
pub struct StaleReadMap<V>(MemoryMap<V>);

impl<V> ObservableMap<V> for StaleReadMap<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn get(&self, _key: &str) -> SyncResult<Option<V>> {
        Ok(None)
    }

    async fn put(&self, key: &str, value: V) -> SyncResult<Option<V>> {
        self.0.put(key, value).await
    }

    async fn put_with_ttl(&self, key: &str, value: V, ttl: Duration) -> SyncResult<Option<V>> {
        self.0.put_with_ttl(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> SyncResult<Option<V>> {
        self.0.remove(key).await
    }

    async fn subscribe(
        &self,
        key: &str,
        include_value: bool,
        listener: EntryListener<V>,
    ) -> SyncResult<Subscription> {
        self.0.subscribe(key, include_value, listener).await
    }

    async fn destroy(&self) -> SyncResult<()> {
        self.0.destroy().await
    }
}

/// [`MemoryStore`] whose task registry reads lag behind its notifications.
///
/// Waits on a task that exists in the wrapped store start blocked, so changes to the task reach
/// them only through their subscription.
#[derive(Debug, Clone, Default)]
pub struct StaleTasksStore(pub MemoryStore);

impl ClusterStore for StaleTasksStore {
    type Map = MemoryMap<String>;
    type Latch = MemoryLatch;
    type Tasks = StaleReadMap<TaskEntry>;
    type TaskContexts = MemoryTaskContexts;

    fn map(&self, name: &str) -> MemoryMap<String> {
        self.0.map(name)
    }

    async fn destroy_map(&self, name: &str) -> SyncResult<()> {
        self.0.destroy_map(name).await
    }

    fn latch(&self, name: &str) -> MemoryLatch {
        self.0.latch(name)
    }

    fn latch_names(&self) -> Vec<String> {
        self.0.latch_names()
    }

    fn tasks(&self) -> StaleReadMap<TaskEntry> {
        StaleReadMap(self.0.tasks())
    }

    fn task_contexts(&self) -> MemoryTaskContexts {
        self.0.task_contexts()
    }
}
