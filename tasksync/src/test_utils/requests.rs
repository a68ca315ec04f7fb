use crate::actions::ActionDispatcher;
use crate::store::ClusterStore;
use crate::types::{Reply, Request, RequestKind};

/// Builds a request of `kind` addressing `selector` in context `context_id`.
pub fn request(kind: RequestKind, context_id: &str, selector: &str) -> Request {
    Request::new(kind)
        .with_task_id("test-task")
        .with_context_id(context_id)
        .with_selector(selector)
}

/// Dispatches `request` against `store` and returns its reply.
pub async fn handle<S: ClusterStore>(store: &S, request: Request) -> Reply {
    ActionDispatcher::new()
        .dispatch(store.clone(), request)
        .handle()
        .await
}
