//! Wait conditions of the coordination operations.

use crate::bail;
use crate::error::{ErrorKind, SyncResult};
use crate::rendezvous::{Settled, WaitCondition, WaitFailure};
use crate::store::{EntryEvent, EntryEventKind};
use crate::types::{TaskContextEntry, TaskEntry, TaskState};

/// Satisfied by any value of a checkpoint.
///
/// Removal and eviction are not forwarded, the wait continues until a new value is written.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointValue;

impl WaitCondition<String> for CheckpointValue {
    type Output = String;

    fn on_snapshot(&self, snapshot: Option<String>) -> SyncResult<Option<Settled<String>>> {
        Ok(snapshot.map(Settled::Ready))
    }

    fn on_event(&self, event: EntryEvent<String>) -> Option<Settled<String>> {
        match event.kind {
            EntryEventKind::Added | EntryEventKind::Updated => event.value.map(Settled::Ready),
            EntryEventKind::Removed | EntryEventKind::Evicted => None,
        }
    }
}

/// Satisfied by any reported state of a task, not only by terminal ones.
///
/// A task that is not registered yet keeps the wait going until it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskCompletion;

impl WaitCondition<TaskEntry> for TaskCompletion {
    type Output = TaskState;

    fn on_snapshot(&self, snapshot: Option<TaskEntry>) -> SyncResult<Option<Settled<TaskState>>> {
        Ok(snapshot.map(|entry| Settled::Ready(entry.state)))
    }

    fn on_event(&self, event: EntryEvent<TaskEntry>) -> Option<Settled<TaskState>> {
        match event.kind {
            EntryEventKind::Added | EntryEventKind::Updated => {
                event.value.map(|entry| Settled::Ready(entry.state))
            }
            EntryEventKind::Removed => Some(Settled::Failed(WaitFailure::Removed)),
            EntryEventKind::Evicted => Some(Settled::Failed(WaitFailure::Evicted)),
        }
    }
}

/// Satisfied when a task context reaches a terminal state.
///
/// A removed or evicted context also satisfies the wait, whatever its last state was. The
/// reported value is then the last known state, or the event kind when the event carries no
/// value.
#[derive(Debug, Clone)]
pub struct ContextCompletion {
    context_id: String,
}

impl ContextCompletion {
    pub fn new(context_id: impl Into<String>) -> Self {
        Self {
            context_id: context_id.into(),
        }
    }
}

impl WaitCondition<TaskContextEntry> for ContextCompletion {
    type Output = String;

    fn on_snapshot(
        &self,
        snapshot: Option<TaskContextEntry>,
    ) -> SyncResult<Option<Settled<String>>> {
        let Some(entry) = snapshot else {
            bail!(
                ErrorKind::NotFound,
                "Task context not found",
                detail = self.context_id.clone()
            );
        };

        Ok(entry
            .state
            .is_terminal()
            .then(|| Settled::Ready(entry.state.to_string())))
    }

    fn on_event(&self, event: EntryEvent<TaskContextEntry>) -> Option<Settled<String>> {
        match event.kind {
            EntryEventKind::Added | EntryEventKind::Updated => event
                .value
                .filter(|entry| entry.state.is_terminal())
                .map(|entry| Settled::Ready(entry.state.to_string())),
            // TODO: decide whether a context removed before reaching a terminal state should fail
            // the wait instead of satisfying it; waiters currently cannot tell the two apart.
            EntryEventKind::Removed | EntryEventKind::Evicted => Some(Settled::Ready(
                event
                    .value
                    .map(|entry| entry.state.to_string())
                    .unwrap_or_else(|| event.kind.to_string()),
            )),
        }
    }
}

/// Satisfied when a latch count is zero or the latch does not exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatchZero;

impl WaitCondition<u32> for LatchZero {
    type Output = ();

    fn on_snapshot(&self, snapshot: Option<u32>) -> SyncResult<Option<Settled<()>>> {
        Ok(matches!(snapshot, None | Some(0)).then_some(Settled::Ready(())))
    }

    fn on_event(&self, event: EntryEvent<u32>) -> Option<Settled<()>> {
        match event.kind {
            EntryEventKind::Added | EntryEventKind::Updated => {
                (event.value == Some(0)).then_some(Settled::Ready(()))
            }
            EntryEventKind::Removed => Some(Settled::Failed(WaitFailure::Removed)),
            EntryEventKind::Evicted => Some(Settled::Failed(WaitFailure::Evicted)),
        }
    }
}
