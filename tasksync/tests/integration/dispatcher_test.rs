use config::shared::WorkerPoolConfig;
use tasksync::store::ClusterStore;
use tasksync::test_utils::requests::{handle, request};
use tasksync::test_utils::store::memory_store;
use tasksync::test_utils::wait::wait_until;
use tasksync::types::{Reply, Request, RequestKind};
use tasksync::workers::RequestWorkerPool;
use telemetry::tracing::init_test_tracing;

#[tokio::test(flavor = "multi_thread")]
async fn unknown_kind_is_answered_with_error() {
    init_test_tracing();

    let store = memory_store();
    let request: Request = r#"{"kind": "FOO", "contextId": "ctx1", "selector": "k"}"#
        .parse()
        .unwrap();

    assert_eq!(
        handle(&store, request).await,
        Reply::error("Unknown request kind: FOO")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn decoded_requests_run_on_the_pool() {
    init_test_tracing();

    let store = memory_store();
    let pool = RequestWorkerPool::new(store.clone(), &WorkerPoolConfig::default());
    let map = store.map("checkpointmap_ctx1");

    let waits: Vec<_> = {
        let mut handles = Vec::new();
        for _ in 0..4 {
            let wait: Request =
                r#"{"kind": "WAIT", "taskId": "t", "contextId": "ctx1", "selector": "ready"}"#
                    .parse()
                    .unwrap();
            handles.push(pool.submit(wait).await);
        }
        handles
    };

    // Waiting requests do not hold up unrelated ones.
    let get = pool
        .submit(request(RequestKind::Get, "ctx1", "other"))
        .await
        .reply()
        .await;
    assert_eq!(get, Reply::ok_absent());

    wait_until("all waits subscribed", || map.listener_count() == 4).await;
    let set = pool
        .submit(request(RequestKind::Set, "ctx1", "ready").with_value("yes"))
        .await
        .reply()
        .await;
    assert_eq!(set, Reply::ok(""));

    for wait in waits {
        assert_eq!(wait.reply().await, Reply::ok("yes"));
    }

    pool.wait_all().await;
    assert_eq!(map.listener_count(), 0);
}
