use std::time::Duration;

use tasksync::store::{ClusterStore, ObservableMap};
use tasksync::test_utils::requests::handle;
use tasksync::test_utils::store::{StaleTasksStore, memory_store, put_context, put_task};
use tasksync::test_utils::wait::wait_until;
use tasksync::types::{Reply, Request, RequestKind, TaskContextState, TaskState};
use telemetry::tracing::init_test_tracing;
use tokio::time::sleep;

fn context_wait(context_id: &str) -> Request {
    Request::new(RequestKind::ContextWait).with_context_id(context_id)
}

fn task_wait(task_id: &str) -> Request {
    Request::new(RequestKind::TaskWait).with_selector(task_id)
}

#[tokio::test(flavor = "multi_thread")]
async fn context_wait_returns_only_on_terminal_state() {
    init_test_tracing();

    let store = memory_store();
    let contexts = store.task_contexts();
    put_context(&store, "ctx1", TaskContextState::Running).await;

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { handle(&store, context_wait("ctx1")).await })
    };
    wait_until("context waiter subscribed", || contexts.listener_count() == 1).await;

    put_context(&store, "ctx1", TaskContextState::Waiting).await;
    sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    put_context(&store, "ctx1", TaskContextState::Finished).await;

    assert_eq!(waiter.await.unwrap(), Reply::ok("FINISHED"));
    assert_eq!(contexts.listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn context_wait_on_finished_context_returns_immediately() {
    init_test_tracing();

    let store = memory_store();
    put_context(&store, "ctx1", TaskContextState::Failed).await;

    assert_eq!(handle(&store, context_wait("ctx1")).await, Reply::ok("FAILED"));
}

#[tokio::test(flavor = "multi_thread")]
async fn removed_context_satisfies_its_waiters() {
    init_test_tracing();

    let store = memory_store();
    let contexts = store.task_contexts();
    put_context(&store, "ctx1", TaskContextState::Running).await;

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { handle(&store, context_wait("ctx1")).await })
    };
    wait_until("context waiter subscribed", || contexts.listener_count() == 1).await;

    contexts.remove("ctx1").await.unwrap();

    assert_eq!(waiter.await.unwrap(), Reply::ok("RUNNING"));
}

#[tokio::test(flavor = "multi_thread")]
async fn context_wait_on_unknown_context_fails() {
    init_test_tracing();

    let store = memory_store();

    let reply = handle(&store, context_wait("ctx-404")).await;

    assert_eq!(reply, Reply::error("Task context not found: ctx-404"));
}

#[tokio::test(flavor = "multi_thread")]
async fn task_wait_on_registered_task_returns_its_state() {
    init_test_tracing();

    let store = memory_store();
    let tasks = store.tasks();
    put_task(&store, "t-1", "ctx1", TaskState::Running).await;

    assert_eq!(handle(&store, task_wait("t-1")).await, Reply::ok("RUNNING"));

    // Without a selector the task id of the request is waited on.
    let by_task_id = Request::new(RequestKind::TaskWait).with_task_id("t-1");
    assert_eq!(handle(&store, by_task_id).await, Reply::ok("RUNNING"));

    assert_eq!(tasks.listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn task_wait_blocks_until_the_task_is_registered() {
    init_test_tracing();

    let store = memory_store();
    let tasks = store.tasks();

    let waiter = {
        let store = store.clone();
        let wait = task_wait("t-1").with_timeout_millis(1_000);
        tokio::spawn(async move { handle(&store, wait).await })
    };
    wait_until("task waiter subscribed", || tasks.listener_count() == 1).await;
    sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    put_task(&store, "t-1", "ctx1", TaskState::Running).await;

    assert_eq!(waiter.await.unwrap(), Reply::ok("RUNNING"));
    assert_eq!(tasks.listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn blocked_task_wait_is_woken_by_a_state_update() {
    init_test_tracing();

    let store = StaleTasksStore::default();
    let tasks = store.0.tasks();
    put_task(&store.0, "t-1", "ctx1", TaskState::Submitted).await;

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { handle(&store, task_wait("t-1")).await })
    };
    wait_until("task waiter subscribed", || tasks.listener_count() == 1).await;
    assert!(!waiter.is_finished());

    put_task(&store.0, "t-1", "ctx1", TaskState::Finished).await;

    assert_eq!(waiter.await.unwrap(), Reply::ok("FINISHED"));
}

#[tokio::test(flavor = "multi_thread")]
async fn task_wait_fails_when_its_task_is_removed() {
    init_test_tracing();

    let store = StaleTasksStore::default();
    let tasks = store.0.tasks();
    put_task(&store.0, "t-1", "ctx1", TaskState::Running).await;

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { handle(&store, task_wait("t-1")).await })
    };
    wait_until("task waiter subscribed", || tasks.listener_count() == 1).await;

    tasks.remove("t-1").await.unwrap();

    assert_eq!(waiter.await.unwrap(), Reply::error("REMOVED"));
    assert_eq!(tasks.listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn task_wait_fails_when_its_task_is_evicted() {
    init_test_tracing();

    let store = StaleTasksStore::default();
    let tasks = store.0.tasks();
    put_task(&store.0, "t-1", "ctx1", TaskState::Finished).await;
    let task = tasks.get("t-1").await.unwrap().unwrap();
    tasks
        .put_with_ttl("t-1", task, Duration::from_millis(500))
        .await
        .unwrap();

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { handle(&store, task_wait("t-1")).await })
    };
    wait_until("task waiter subscribed", || tasks.listener_count() == 1).await;

    assert_eq!(waiter.await.unwrap(), Reply::error("EVICTED"));
    assert_eq!(tasks.get("t-1").await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn task_wait_on_unknown_task_times_out() {
    init_test_tracing();

    let store = memory_store();

    let reply = handle(&store, task_wait("t-9").with_timeout_millis(100)).await;

    assert_eq!(reply, Reply::timeout());
    assert_eq!(store.tasks().listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn task_wait_without_any_id_is_rejected() {
    init_test_tracing();

    let store = memory_store();

    let reply = handle(&store, Request::new(RequestKind::TaskWait).with_timeout_millis(30)).await;

    assert_eq!(reply, Reply::error("Task id must be non-empty"));
}
