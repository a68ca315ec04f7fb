use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, SyncResult};
use crate::rendezvous::conditions::{ContextCompletion, TaskCompletion};
use crate::rendezvous::{MapKey, WaitOutcome, rendezvous};
use crate::store::{ClusterStore, TaskContextRegistry};
use crate::types::{Reply, Request, TaskContextDescriptor};

/// Returns the selector, or `fallback` when the selector is empty.
fn target_id<'a>(request: &'a Request, fallback: &'a str) -> &'a str {
    if request.selector.is_empty() {
        fallback
    } else {
        &request.selector
    }
}

/// Waits until a task reports a state.
#[derive(Debug)]
pub struct TaskWaitAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> TaskWaitAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        let task_id = target_id(&self.request, &self.request.task_id);
        if task_id.is_empty() {
            bail!(ErrorKind::ValidationError, "Task id must be non-empty");
        }

        let tasks = self.store.tasks();
        let outcome = rendezvous(
            &MapKey::new(&tasks, task_id),
            TaskCompletion,
            self.request.timeout(),
        )
        .await?;

        match outcome {
            WaitOutcome::Ready(state) => Ok(Reply::ok(state.as_str())),
            WaitOutcome::Failed(failure) => Ok(Reply::error(failure.as_str())),
            WaitOutcome::TimedOut => bail!(ErrorKind::WaitTimeout, "Task wait timed out", task_id),
        }
    }
}

/// Waits until a task context reaches a terminal state.
#[derive(Debug)]
pub struct ContextWaitAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> ContextWaitAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        let context_id = target_id(&self.request, &self.request.context_id);
        if context_id.is_empty() {
            bail!(ErrorKind::ValidationError, "Context id must be non-empty");
        }

        let contexts = self.store.task_contexts();
        let outcome = rendezvous(
            &MapKey::new(&contexts, context_id),
            ContextCompletion::new(context_id),
            self.request.timeout(),
        )
        .await?;

        match outcome {
            WaitOutcome::Ready(state) => Ok(Reply::ok(state)),
            WaitOutcome::Failed(failure) => Ok(Reply::error(failure.as_str())),
            WaitOutcome::TimedOut => bail!(
                ErrorKind::WaitTimeout,
                "Task context wait timed out",
                context_id
            ),
        }
    }
}

/// Registers a task context described by the JSON request value.
#[derive(Debug)]
pub struct ContextSubmitAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> ContextSubmitAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        let Some(raw) = self.request.value.as_deref() else {
            bail!(ErrorKind::ValidationError, "Task context descriptor is missing");
        };
        let descriptor: TaskContextDescriptor = serde_json::from_str(raw)?;

        let context_id = self.store.task_contexts().submit(descriptor).await?;
        info!(%context_id, task_id = %self.request.task_id, "context submitted on behalf of task");

        Ok(Reply::ok(context_id))
    }
}
