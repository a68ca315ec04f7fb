//! Request handlers.
//!
//! Every request kind maps to one action type. An [`Action`] is consumed by [`Action::handle`],
//! so each request is answered exactly once, and every failure is turned into an ERROR reply
//! there.

mod checkpoint;
mod completion;
mod dispatcher;
mod latch;

use tracing::{debug, error, warn};

use crate::error::{ErrorKind, SyncResult};
use crate::store::ClusterStore;
use crate::sync_error;
use crate::types::{Reply, RequestKind};

pub use checkpoint::{GetAction, SetAction, WaitAction};
pub use completion::{ContextSubmitAction, ContextWaitAction, TaskWaitAction};
pub use dispatcher::ActionDispatcher;
pub use latch::{LatchDownAction, LatchHasCountAction, LatchSetAction, LatchWaitAction};

/// Answers a request whose kind is not known.
#[derive(Debug, Clone)]
pub struct UnknownAction {
    token: String,
}

impl UnknownAction {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    fn execute(self) -> SyncResult<Reply> {
        Err(sync_error!(
            ErrorKind::UnknownRequestKind,
            "Unknown request kind",
            detail = self.token
        ))
    }
}

/// A request bound to its handler and to the store it runs against.
#[derive(Debug)]
pub enum Action<S> {
    Get(GetAction<S>),
    Set(SetAction<S>),
    Wait(WaitAction<S>),
    LatchSet(LatchSetAction<S>),
    LatchDown(LatchDownAction<S>),
    LatchWait(LatchWaitAction<S>),
    LatchHasCount(LatchHasCountAction<S>),
    ContextWait(ContextWaitAction<S>),
    TaskWait(TaskWaitAction<S>),
    ContextSubmit(ContextSubmitAction<S>),
    Unknown(UnknownAction),
}

impl<S: ClusterStore> Action<S> {
    /// Kind of request this action answers, [`None`] for an unknown kind.
    pub fn kind(&self) -> Option<RequestKind> {
        let kind = match self {
            Action::Get(_) => RequestKind::Get,
            Action::Set(_) => RequestKind::Set,
            Action::Wait(_) => RequestKind::Wait,
            Action::LatchSet(_) => RequestKind::LatchSet,
            Action::LatchDown(_) => RequestKind::LatchDown,
            Action::LatchWait(_) => RequestKind::LatchWait,
            Action::LatchHasCount(_) => RequestKind::LatchHasCount,
            Action::ContextWait(_) => RequestKind::ContextWait,
            Action::TaskWait(_) => RequestKind::TaskWait,
            Action::ContextSubmit(_) => RequestKind::ContextSubmit,
            Action::Unknown(_) => return None,
        };

        Some(kind)
    }

    /// Runs the action and produces its reply.
    ///
    /// Never fails: errors are logged and answered with an ERROR reply.
    pub async fn handle(self) -> Reply {
        let kind = self.kind();

        match self.execute().await {
            Ok(reply) => reply,
            Err(err) => {
                let retryable = err.kind().is_retryable();
                match err.kind() {
                    ErrorKind::WaitTimeout => debug!(?kind, %err, "wait timed out"),
                    ErrorKind::Interrupted => error!(?kind, %err, "request failed"),
                    _ => warn!(?kind, retryable, %err, "request failed"),
                }

                Reply::from(&err)
            }
        }
    }

    async fn execute(self) -> SyncResult<Reply> {
        match self {
            Action::Get(action) => action.execute().await,
            Action::Set(action) => action.execute().await,
            Action::Wait(action) => action.execute().await,
            Action::LatchSet(action) => action.execute().await,
            Action::LatchDown(action) => action.execute().await,
            Action::LatchWait(action) => action.execute().await,
            Action::LatchHasCount(action) => action.execute().await,
            Action::ContextWait(action) => action.execute().await,
            Action::TaskWait(action) => action.execute().await,
            Action::ContextSubmit(action) => action.execute().await,
            Action::Unknown(action) => action.execute(),
        }
    }
}
