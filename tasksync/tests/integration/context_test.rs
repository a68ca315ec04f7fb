use std::time::Duration;

use config::shared::ContextConfig;
use tasksync::contexts::cleanup_task_context;
use tasksync::store::{ClusterStore, CountDownLatch, ObservableMap};
use tasksync::test_utils::requests::{handle, request};
use tasksync::test_utils::store::memory_store;
use tasksync::test_utils::wait::wait_until;
use tasksync::types::{Reply, Request, RequestKind, TaskState};
use telemetry::tracing::init_test_tracing;

const DESCRIPTOR: &str = r#"{
    "name": "client-server",
    "properties": {"rounds": "3"},
    "templates": [
        {"name": "client", "taskDescriptor": {"name": "client", "properties": {"role": "client"}}}
    ],
    "tasks": [
        {"name": "server", "descriptor": {"taskDescriptor": {"name": "server"}}},
        {"name": "client-1", "descriptor": {"fromTemplate": "client"}, "properties": {"id": "1"}},
        {"name": "client-2", "descriptor": {"fromTemplate": "client"}, "properties": {"id": "2"}}
    ]
}"#;

async fn submit(store: &tasksync::store::memory::MemoryStore) -> String {
    let reply = handle(
        store,
        Request::new(RequestKind::ContextSubmit).with_value(DESCRIPTOR),
    )
    .await;
    assert!(reply.is_ok(), "submission failed: {reply:?}");

    reply.value().unwrap().to_owned()
}

#[tokio::test(flavor = "multi_thread")]
async fn submitted_context_is_waitable() {
    init_test_tracing();

    let store = memory_store();
    let context_id = submit(&store).await;

    let context = store
        .task_contexts()
        .get(&context_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(context.name, "client-server");
    assert_eq!(context.contained_tasks.len(), 3);

    for task_id in &context.contained_tasks {
        let task = store.tasks().get(task_id).await.unwrap().unwrap();
        assert_eq!(task.properties.get("rounds").map(String::as_str), Some("3"));

        let wait = Request::new(RequestKind::TaskWait).with_selector(task_id.clone());
        assert_eq!(
            handle(&store, wait).await,
            Reply::ok(TaskState::Submitted.as_str())
        );
    }

    let bounded = Request::new(RequestKind::ContextWait)
        .with_context_id(context_id)
        .with_timeout_millis(30);
    assert_eq!(handle(&store, bounded).await, Reply::error("TIMEOUT"));
}

#[tokio::test(flavor = "multi_thread")]
async fn submission_with_unknown_template_is_rejected() {
    init_test_tracing();

    let store = memory_store();
    let descriptor = r#"{"name": "broken", "tasks": [{"name": "t", "descriptor": {"fromTemplate": "nope"}}]}"#;

    let reply = handle(
        &store,
        Request::new(RequestKind::ContextSubmit).with_value(descriptor),
    )
    .await;

    assert_eq!(reply, Reply::error("Unknown task template: nope"));
}

#[tokio::test(flavor = "multi_thread")]
async fn cleanup_destroys_shared_resources() {
    init_test_tracing();

    let store = memory_store();
    let context_id = submit(&store).await;
    let checkpoints = store.map(&format!("checkpointmap_{context_id}"));

    let set = request(RequestKind::Set, &context_id, "progress").with_value("50");
    assert!(handle(&store, set).await.is_ok());
    let arm = request(RequestKind::LatchSet, &context_id, "barrier").with_value("2");
    assert!(handle(&store, arm).await.is_ok());
    let other_arm = request(RequestKind::LatchSet, "other", "barrier").with_value("1");
    assert!(handle(&store, other_arm).await.is_ok());

    let waiter = {
        let store = store.clone();
        let wait = request(RequestKind::Wait, &context_id, "never-set");
        tokio::spawn(async move { handle(&store, wait).await })
    };
    wait_until("checkpoint waiter subscribed", || checkpoints.listener_count() == 1).await;

    cleanup_task_context(&store, &context_id, &ContextConfig::default())
        .await
        .unwrap();

    let reply = waiter.await.unwrap();
    assert!(!reply.is_ok());
    assert!(store.map_names().is_empty());
    assert_eq!(checkpoints.listener_count(), 0);
    assert_eq!(
        handle(&store, request(RequestKind::Get, &context_id, "progress")).await,
        Reply::ok_absent()
    );
    assert_eq!(store.latch_names(), vec!["latch_other_barrier".to_owned()]);
    assert_eq!(
        store.latch("latch_other_barrier").count().await.unwrap(),
        Some(1)
    );

    // Entries stay readable until their TTL elapses.
    assert!(store.task_contexts().get(&context_id).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn cleaned_up_context_is_evicted_after_ttl() {
    init_test_tracing();

    let store = memory_store();
    let context_id = submit(&store).await;
    let contexts = store.task_contexts();
    let task_ids = contexts
        .get(&context_id)
        .await
        .unwrap()
        .unwrap()
        .contained_tasks;

    let config = ContextConfig {
        context_ttl_secs: 60,
        task_ttl_secs: 30,
    };
    cleanup_task_context(&store, &context_id, &config)
        .await
        .unwrap();

    let waiter = {
        let store = store.clone();
        let wait = Request::new(RequestKind::ContextWait).with_context_id(context_id.clone());
        tokio::spawn(async move { handle(&store, wait).await })
    };
    while contexts.listener_count() == 0 {
        tokio::task::yield_now().await;
    }

    tokio::time::sleep(Duration::from_secs(31)).await;
    for task_id in &task_ids {
        assert_eq!(store.tasks().get(task_id).await.unwrap(), None);
    }
    assert!(!waiter.is_finished());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(contexts.get(&context_id).await.unwrap(), None);

    // Eviction satisfies a context wait with the last known state.
    assert_eq!(waiter.await.unwrap(), Reply::ok("RUNNING"));
}
