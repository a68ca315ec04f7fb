use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SyncResult;
use crate::types::{TaskContextDescriptor, TaskContextEntry, TaskEntry};

/// Kind of change delivered to an entry listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryEventKind {
    Added,
    Updated,
    Removed,
    Evicted,
}

impl EntryEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryEventKind::Added => "ADDED",
            EntryEventKind::Updated => "UPDATED",
            EntryEventKind::Removed => "REMOVED",
            EntryEventKind::Evicted => "EVICTED",
        }
    }
}

impl fmt::Display for EntryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change of one entry of an [`ObservableMap`].
///
/// `value` is the new value for [`EntryEventKind::Added`] and [`EntryEventKind::Updated`] and the
/// last value for [`EntryEventKind::Removed`] and [`EntryEventKind::Evicted`]. It is [`None`]
/// when the subscription did not ask for values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryEvent<V> {
    pub kind: EntryEventKind,
    pub key: String,
    pub value: Option<V>,
}

/// Callback invoked by a store for every event on a subscribed key.
///
/// Listeners are called from store threads and must not block.
pub type EntryListener<V> = Arc<dyn Fn(EntryEvent<V>) + Send + Sync>;

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Registration of one [`EntryListener`] on one key.
///
/// The listener is unregistered when the subscription is dropped, so a subscription never
/// outlives the scope that created it.
pub struct Subscription {
    id: u64,
    key: String,
    release: Option<Release>,
}

impl Subscription {
    /// Creates a subscription running `release` exactly once when dropped.
    pub fn new<F>(id: u64, key: impl Into<String>, release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            id,
            key: key.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Unregisters the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}

/// A named map of the distributed store whose entries can be watched.
///
/// Implementations provide per-key atomic reads and writes and deliver every change of a key
/// to the listeners subscribed to that key. A listener registered before a write completes is
/// guaranteed to observe that write.
pub trait ObservableMap<V>: Clone + Send + Sync + 'static
where
    V: Clone + Send + Sync + 'static,
{
    /// Name of the map in the store.
    fn name(&self) -> &str;

    /// Returns the current value of `key`.
    fn get(&self, key: &str) -> impl Future<Output = SyncResult<Option<V>>> + Send;

    /// Writes `value` under `key` and returns the previous value.
    fn put(&self, key: &str, value: V) -> impl Future<Output = SyncResult<Option<V>>> + Send;

    /// Writes `value` under `key`, evicting it once `ttl` elapsed unless it was overwritten.
    fn put_with_ttl(
        &self,
        key: &str,
        value: V,
        ttl: Duration,
    ) -> impl Future<Output = SyncResult<Option<V>>> + Send;

    /// Removes `key` and returns its last value.
    fn remove(&self, key: &str) -> impl Future<Output = SyncResult<Option<V>>> + Send;

    /// Registers `listener` for changes of `key`.
    ///
    /// When `include_value` is false, events are delivered without values.
    fn subscribe(
        &self,
        key: &str,
        include_value: bool,
        listener: EntryListener<V>,
    ) -> impl Future<Output = SyncResult<Subscription>> + Send;

    /// Drops every entry and every listener of the map.
    ///
    /// Waiters subscribed to the map observe the destruction as a failed wait.
    fn destroy(&self) -> impl Future<Output = SyncResult<()>> + Send;
}

/// A named count-down latch of the distributed store.
pub trait CountDownLatch: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Returns the current count, or [`None`] when the latch was never armed.
    fn count(&self) -> impl Future<Output = SyncResult<Option<u32>>> + Send;

    /// Returns `true` while the count is above zero.
    fn has_count(&self) -> impl Future<Output = SyncResult<bool>> + Send {
        async move { Ok(self.count().await?.is_some_and(|count| count > 0)) }
    }

    /// Arms the latch to `count`.
    ///
    /// Returns `false` without changing anything when the latch is still counting down.
    fn set_count(&self, count: u32) -> impl Future<Output = SyncResult<bool>> + Send;

    /// Decrements the count by one. Has no effect on an absent latch or a latch at zero.
    fn count_down(&self) -> impl Future<Output = SyncResult<()>> + Send;

    /// Waits for the count to reach zero.
    ///
    /// A single call never waits longer than the store's own maximum await duration, even when
    /// `timeout` is [`None`] or longer. Returns `false` when the call returned before zero was
    /// reached.
    fn await_zero(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = SyncResult<bool>> + Send;

    /// Destroys the latch. Pending awaits fail.
    fn destroy(&self) -> impl Future<Output = SyncResult<()>> + Send;
}

/// Registry of task contexts, keyed by context id.
pub trait TaskContextRegistry: ObservableMap<TaskContextEntry> {
    /// Registers a context and its tasks, returning the assigned context id.
    fn submit(
        &self,
        descriptor: TaskContextDescriptor,
    ) -> impl Future<Output = SyncResult<String>> + Send;
}

/// Handle to the cluster-wide store shared by all coordinator nodes.
///
/// Obtaining a map or a latch is cheap and never fails, resources are created on first use.
pub trait ClusterStore: Clone + Send + Sync + 'static {
    type Map: ObservableMap<String>;
    type Latch: CountDownLatch;
    type Tasks: ObservableMap<TaskEntry>;
    type TaskContexts: TaskContextRegistry;

    fn map(&self, name: &str) -> Self::Map;

    /// Destroys the map named `name` and releases everything the store keeps for it.
    ///
    /// Pending waits on the map fail. A later [`Self::map`] call starts from an empty map.
    fn destroy_map(&self, name: &str) -> impl Future<Output = SyncResult<()>> + Send {
        let map = self.map(name);
        async move { map.destroy().await }
    }

    fn latch(&self, name: &str) -> Self::Latch;

    /// Returns the names of all latches currently known to the store.
    fn latch_names(&self) -> Vec<String>;

    /// Registry of tasks, keyed by task id.
    fn tasks(&self) -> Self::Tasks;

    fn task_contexts(&self) -> Self::TaskContexts;
}
