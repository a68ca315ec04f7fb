use std::time::Duration;

use tasksync::store::ClusterStore;
use tasksync::test_utils::requests::{handle, request};
use tasksync::test_utils::store::memory_store;
use tasksync::test_utils::wait::wait_until;
use tasksync::types::{Reply, RequestKind};
use telemetry::tracing::init_test_tracing;
use tokio::time::{Instant, sleep};

#[tokio::test(flavor = "multi_thread")]
async fn wait_observes_set_racing_with_its_start() {
    init_test_tracing();

    for delay_ms in [0, 1, 50] {
        let store = memory_store();
        let selector = format!("race-{delay_ms}");

        let waiter = {
            let store = store.clone();
            let wait = request(RequestKind::Wait, "ctx1", &selector);
            tokio::spawn(async move { handle(&store, wait).await })
        };

        sleep(Duration::from_millis(delay_ms)).await;
        let set = request(RequestKind::Set, "ctx1", &selector).with_value("42");
        assert!(handle(&store, set).await.is_ok());

        let reply = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter missed the write")
            .unwrap();
        assert_eq!(reply, Reply::ok("42"));
        assert_eq!(store.map("checkpointmap_ctx1").listener_count(), 0);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn timed_out_wait_releases_its_subscription() {
    init_test_tracing();

    let store = memory_store();
    let started = Instant::now();

    let reply = handle(
        &store,
        request(RequestKind::Wait, "ctx1", "never").with_timeout_millis(100),
    )
    .await;

    assert_eq!(reply, Reply::error("TIMEOUT"));
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(store.map("checkpointmap_ctx1").listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn get_of_unset_key_has_no_side_effects() {
    init_test_tracing();

    let store = memory_store();

    for _ in 0..2 {
        let reply = handle(&store, request(RequestKind::Get, "ctx1", "missing")).await;
        assert_eq!(reply, Reply::ok_absent());
        assert_eq!(reply.value(), None);
    }
    assert_eq!(store.map("checkpointmap_ctx1").keys(), Vec::<String>::new());
}

#[tokio::test(flavor = "multi_thread")]
async fn every_waiter_is_woken_by_one_set() {
    init_test_tracing();

    const WAITERS: usize = 8;
    let store = memory_store();
    let map = store.map("checkpointmap_ctx1");

    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                handle(&store, request(RequestKind::Wait, "ctx1", "go")).await
            })
        })
        .collect();

    wait_until("all waiters subscribed", || map.listener_count() == WAITERS).await;
    let set = request(RequestKind::Set, "ctx1", "go").with_value("now");
    assert!(handle(&store, set).await.is_ok());

    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), Reply::ok("now"));
    }
    assert_eq!(map.listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn set_get_wait_round_trip() {
    init_test_tracing();

    let store = memory_store();

    let set = request(RequestKind::Set, "ctx1", "k").with_value("v");
    assert_eq!(handle(&store, set).await, Reply::ok(""));
    assert_eq!(
        handle(&store, request(RequestKind::Get, "ctx1", "k")).await,
        Reply::ok("v")
    );
    assert_eq!(
        handle(&store, request(RequestKind::Wait, "ctx1", "k")).await,
        Reply::ok("v")
    );

    assert_eq!(
        handle(&store, request(RequestKind::Get, "ctx2", "k")).await,
        Reply::ok_absent()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_selector_is_rejected_for_checkpoints() {
    init_test_tracing();

    let store = memory_store();

    for kind in [RequestKind::Get, RequestKind::Set, RequestKind::Wait] {
        assert_eq!(
            handle(&store, request(kind, "ctx1", "")).await,
            Reply::error("Key must be non-empty")
        );
    }
}
