use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::SyncResult;
use crate::store::{EntryEvent, EntryEventKind, EntryListener, ObservableMap, Subscription};

/// A stored value and the write that produced it.
#[derive(Debug)]
struct Slot<V> {
    value: V,
    generation: u64,
}

struct Registration<V> {
    key: String,
    include_value: bool,
    listener: EntryListener<V>,
}

/// Inner state of [`MemoryMap`].
struct MapState<V> {
    entries: HashMap<String, Slot<V>>,
    listeners: HashMap<u64, Registration<V>>,
    next_listener_id: u64,
    /// Incremented on every write, a TTL eviction only fires if the entry was not rewritten.
    next_generation: u64,
}

/// Events collected under the lock and delivered after it is released.
struct PendingEvents<V>(Vec<(EntryListener<V>, EntryEvent<V>)>);

impl<V> PendingEvents<V> {
    fn deliver(self) {
        for (listener, event) in self.0 {
            listener(event);
        }
    }
}

impl<V: Clone> MapState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            listeners: HashMap::new(),
            next_listener_id: 0,
            next_generation: 0,
        }
    }

    fn write(&mut self, key: &str, value: V) -> (Option<V>, u64) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let previous = self
            .entries
            .insert(key.to_owned(), Slot { value, generation })
            .map(|slot| slot.value);

        (previous, generation)
    }

    fn events_for(&self, kind: EntryEventKind, key: &str, value: Option<&V>) -> PendingEvents<V> {
        let events = self
            .listeners
            .values()
            .filter(|registration| registration.key == key)
            .map(|registration| {
                let event = EntryEvent {
                    kind,
                    key: key.to_owned(),
                    value: if registration.include_value {
                        value.cloned()
                    } else {
                        None
                    },
                };
                (registration.listener.clone(), event)
            })
            .collect();

        PendingEvents(events)
    }
}

/// In-memory [`ObservableMap`].
///
/// Reads and writes of one map are serialized by a mutex. Listeners are invoked after the mutex
/// is released, on the thread that performed the write.
pub struct MemoryMap<V> {
    name: Arc<str>,
    state: Arc<Mutex<MapState<V>>>,
}

impl<V> MemoryMap<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MapState::new())),
        }
    }

    /// Number of live subscriptions on this map, across all keys.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Keys currently present in the map.
    pub fn keys(&self) -> Vec<String> {
        self.lock().entries.keys().cloned().collect()
    }

    /// Atomically replaces the value of `key` with the result of `update`.
    ///
    /// `update` receives the current value and returns the new one, or [`None`] to leave the
    /// entry untouched. Returns whether a write happened.
    pub fn compute<F>(&self, key: &str, update: F) -> bool
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let pending = {
            let mut state = self.lock();
            let Some(value) = update(state.entries.get(key).map(|slot| &slot.value)) else {
                return false;
            };

            let (previous, _) = state.write(key, value.clone());
            state.events_for(event_kind_for(&previous), key, Some(&value))
        };

        pending.deliver();

        true
    }

    fn lock(&self) -> MutexGuard<'_, MapState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put_internal(&self, key: &str, value: V) -> (Option<V>, u64) {
        let (previous, generation, pending) = {
            let mut state = self.lock();
            let (previous, generation) = state.write(key, value.clone());
            let pending = state.events_for(event_kind_for(&previous), key, Some(&value));
            (previous, generation, pending)
        };

        pending.deliver();

        (previous, generation)
    }

    fn remove_internal(&self, key: &str, kind: EntryEventKind) -> Option<V> {
        self.remove_if(key, kind, |_| true)
    }

    /// Removes `key` if `matches` accepts the generation of its current write.
    ///
    /// The check and the removal happen under one lock, so a write racing with the removal is
    /// either removed as a whole or left untouched.
    fn remove_if<F>(&self, key: &str, kind: EntryEventKind, matches: F) -> Option<V>
    where
        F: FnOnce(u64) -> bool,
    {
        let (removed, pending) = {
            let mut state = self.lock();
            if !state.entries.get(key).is_some_and(|slot| matches(slot.generation)) {
                return None;
            }
            let slot = state.entries.remove(key)?;
            let pending = state.events_for(kind, key, Some(&slot.value));
            (slot.value, pending)
        };

        pending.deliver();

        Some(removed)
    }

    /// Evicts `key` if it still holds the write identified by `generation`.
    fn evict(state: Weak<Mutex<MapState<V>>>, name: Arc<str>, key: &str, generation: u64) {
        let Some(state) = state.upgrade() else {
            return;
        };
        let map = MemoryMap { name, state };

        if map
            .remove_if(key, EntryEventKind::Evicted, |current| current == generation)
            .is_some()
        {
            debug!(map = %map.name, key, "evicted expired entry");
        }
    }

    fn unsubscribe(state: &Weak<Mutex<MapState<V>>>, id: u64) {
        if let Some(state) = state.upgrade() {
            let removed = state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .remove(&id);
            // Dropped outside of the lock, the listener may own arbitrary resources.
            drop(removed);
        }
    }
}

fn event_kind_for<V>(previous: &Option<V>) -> EntryEventKind {
    if previous.is_some() {
        EntryEventKind::Updated
    } else {
        EntryEventKind::Added
    }
}

impl<V> ObservableMap<V> for MemoryMap<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> SyncResult<Option<V>> {
        Ok(self.lock().entries.get(key).map(|slot| slot.value.clone()))
    }

    async fn put(&self, key: &str, value: V) -> SyncResult<Option<V>> {
        Ok(self.put_internal(key, value).0)
    }

    async fn put_with_ttl(&self, key: &str, value: V, ttl: Duration) -> SyncResult<Option<V>> {
        let (previous, generation) = self.put_internal(key, value);

        let state = Arc::downgrade(&self.state);
        let name = self.name.clone();
        let key = key.to_owned();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            MemoryMap::evict(state, name, &key, generation);
        });

        Ok(previous)
    }

    async fn remove(&self, key: &str) -> SyncResult<Option<V>> {
        Ok(self.remove_internal(key, EntryEventKind::Removed))
    }

    async fn subscribe(
        &self,
        key: &str,
        include_value: bool,
        listener: EntryListener<V>,
    ) -> SyncResult<Subscription> {
        let id = {
            let mut state = self.lock();
            state.next_listener_id += 1;
            let id = state.next_listener_id;
            state.listeners.insert(
                id,
                Registration {
                    key: key.to_owned(),
                    include_value,
                    listener,
                },
            );
            id
        };

        trace!(map = %self.name, key, id, "listener registered");

        let state = Arc::downgrade(&self.state);
        Ok(Subscription::new(id, key, move || {
            MemoryMap::unsubscribe(&state, id);
        }))
    }

    async fn destroy(&self) -> SyncResult<()> {
        let (entries, listeners) = {
            let mut state = self.lock();
            (
                std::mem::take(&mut state.entries),
                std::mem::take(&mut state.listeners),
            )
        };

        debug!(
            map = %self.name,
            entries = entries.len(),
            listeners = listeners.len(),
            "map destroyed"
        );

        Ok(())
    }
}

impl<V> Clone for MemoryMap<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: self.state.clone(),
        }
    }
}

impl<V> fmt::Debug for MemoryMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMap")
            .field("name", &self.name)
            .finish()
    }
}
