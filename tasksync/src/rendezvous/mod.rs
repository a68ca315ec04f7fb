//! Race-free waits on a single key of the distributed store.
//!
//! A wait never misses a change that happens after it started: [`rendezvous`] subscribes to the
//! key before it reads it, so any write racing with the read is delivered through the
//! subscription. The subscription and its delivery queue belong to one call and are released on
//! every exit path, including when the waiting future is dropped.
//!
//! What satisfies a wait is decided by a [`WaitCondition`]; [`conditions`] holds the conditions
//! used by the checkpoint, latch and completion operations.

pub mod conditions;
mod engine;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::SyncResult;
use crate::store::{EntryEvent, EntryListener, ObservableMap, Subscription};

pub use engine::rendezvous;

/// How long a wait may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTimeout {
    Indefinite,
    Bounded(Duration),
}

impl WaitTimeout {
    /// Zero and negative values wait indefinitely.
    pub fn from_millis(millis: i64) -> Self {
        match u64::try_from(millis) {
            Ok(millis) if millis > 0 => WaitTimeout::Bounded(Duration::from_millis(millis)),
            _ => WaitTimeout::Indefinite,
        }
    }
}

/// Why a watched entry can no longer satisfy a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitFailure {
    Removed,
    Evicted,
}

impl WaitFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitFailure::Removed => "REMOVED",
            WaitFailure::Evicted => "EVICTED",
        }
    }
}

impl fmt::Display for WaitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision of a [`WaitCondition`] that ends the wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T> {
    Ready(T),
    Failed(WaitFailure),
}

/// Result of [`rendezvous`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Ready(T),
    Failed(WaitFailure),
    TimedOut,
}

impl<T> From<Settled<T>> for WaitOutcome<T> {
    fn from(settled: Settled<T>) -> Self {
        match settled {
            Settled::Ready(value) => WaitOutcome::Ready(value),
            Settled::Failed(failure) => WaitOutcome::Failed(failure),
        }
    }
}

/// Decides which observations of a watched entry end a wait.
pub trait WaitCondition<V>: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Classifies the snapshot read taken after subscribing.
    ///
    /// [`None`] keeps waiting, an error aborts the wait.
    fn on_snapshot(&self, snapshot: Option<V>) -> SyncResult<Option<Settled<Self::Output>>>;

    /// Classifies a delivered event; [`None`] drops it.
    fn on_event(&self, event: EntryEvent<V>) -> Option<Settled<Self::Output>>;
}

/// A single entry that can be read and watched.
pub trait Watchable<V>: Send + Sync {
    /// Human readable name of the watched entry, used in logs.
    fn target(&self) -> String;

    fn snapshot(&self) -> impl Future<Output = SyncResult<Option<V>>> + Send;

    fn watch(
        &self,
        listener: EntryListener<V>,
    ) -> impl Future<Output = SyncResult<Subscription>> + Send;
}

/// One key of an [`ObservableMap`].
#[derive(Debug)]
pub struct MapKey<'a, M> {
    map: &'a M,
    key: &'a str,
}

impl<'a, M> MapKey<'a, M> {
    pub fn new(map: &'a M, key: &'a str) -> Self {
        Self { map, key }
    }
}

impl<V, M> Watchable<V> for MapKey<'_, M>
where
    V: Clone + Send + Sync + 'static,
    M: ObservableMap<V>,
{
    fn target(&self) -> String {
        format!("{}/{}", self.map.name(), self.key)
    }

    fn snapshot(&self) -> impl Future<Output = SyncResult<Option<V>>> + Send {
        self.map.get(self.key)
    }

    fn watch(
        &self,
        listener: EntryListener<V>,
    ) -> impl Future<Output = SyncResult<Subscription>> + Send {
        self.map.subscribe(self.key, true, listener)
    }
}
