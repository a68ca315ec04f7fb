use std::collections::HashMap;

use tracing::trace;

use crate::actions::{
    Action, ContextSubmitAction, ContextWaitAction, GetAction, LatchDownAction,
    LatchHasCountAction, LatchSetAction, LatchWaitAction, SetAction, TaskWaitAction,
    UnknownAction, WaitAction,
};
use crate::store::ClusterStore;
use crate::types::{Request, RequestKind};

/// Routes requests to their actions.
///
/// The token table is built once and never changes, so one dispatcher can be shared by every
/// request handler.
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    kinds: HashMap<&'static str, RequestKind>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        let kinds = RequestKind::ALL
            .into_iter()
            .map(|kind| (kind.as_str(), kind))
            .collect();

        Self { kinds }
    }

    /// Parses a request kind token; tokens are case-sensitive.
    pub fn resolve(&self, token: &str) -> Option<RequestKind> {
        self.kinds.get(token).copied()
    }

    /// Builds the action answering `request` against `store`.
    pub fn dispatch<S: ClusterStore>(&self, store: S, request: Request) -> Action<S> {
        let Some(kind) = self.resolve(&request.kind) else {
            return Action::Unknown(UnknownAction::new(request.kind));
        };

        trace!(%kind, context_id = %request.context_id, "dispatching request");

        match kind {
            RequestKind::Get => Action::Get(GetAction::new(store, request)),
            RequestKind::Set => Action::Set(SetAction::new(store, request)),
            RequestKind::Wait => Action::Wait(WaitAction::new(store, request)),
            RequestKind::LatchSet => Action::LatchSet(LatchSetAction::new(store, request)),
            RequestKind::LatchDown => Action::LatchDown(LatchDownAction::new(store, request)),
            RequestKind::LatchWait => Action::LatchWait(LatchWaitAction::new(store, request)),
            RequestKind::LatchHasCount => {
                Action::LatchHasCount(LatchHasCountAction::new(store, request))
            }
            RequestKind::ContextWait => {
                Action::ContextWait(ContextWaitAction::new(store, request))
            }
            RequestKind::TaskWait => Action::TaskWait(TaskWaitAction::new(store, request)),
            RequestKind::ContextSubmit => {
                Action::ContextSubmit(ContextSubmitAction::new(store, request))
            }
        }
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
