use std::time::Duration;

use tasksync::store::{ClusterStore, CountDownLatch};
use tasksync::test_utils::requests::{handle, request};
use tasksync::test_utils::store::{memory_store, memory_store_with_latch_await};
use tasksync::test_utils::wait::wait_until;
use tasksync::types::{Reply, RequestKind};
use telemetry::tracing::init_test_tracing;
use tokio::time::sleep;

#[tokio::test(flavor = "multi_thread")]
async fn latch_lifecycle() {
    init_test_tracing();

    let store = memory_store();
    let set = |count: &str| request(RequestKind::LatchSet, "ctx1", "barrier").with_value(count);

    assert_eq!(handle(&store, set("5")).await, Reply::ok(""));
    assert_eq!(
        handle(&store, request(RequestKind::LatchHasCount, "ctx1", "barrier")).await,
        Reply::ok("true")
    );

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move {
            handle(&store, request(RequestKind::LatchWait, "ctx1", "barrier")).await
        })
    };

    for _ in 0..5 {
        assert_eq!(
            handle(&store, request(RequestKind::LatchDown, "ctx1", "barrier")).await,
            Reply::ok("")
        );
    }

    assert_eq!(
        handle(&store, request(RequestKind::LatchHasCount, "ctx1", "barrier")).await,
        Reply::ok("false")
    );
    assert_eq!(waiter.await.unwrap(), Reply::ok("true"));

    // Re-arming is allowed once the latch reached zero, but not while it counts down.
    assert_eq!(handle(&store, set("2")).await, Reply::ok(""));
    let rejected = handle(&store, set("7")).await;
    assert!(!rejected.is_ok());
    assert_eq!(
        store.latch("latch_ctx1_barrier").count().await.unwrap(),
        Some(2)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn indefinite_wait_outlasts_the_store_await_bound() {
    init_test_tracing();

    let store = memory_store_with_latch_await(20);
    let set = request(RequestKind::LatchSet, "ctx1", "slow").with_value("1");
    assert!(handle(&store, set).await.is_ok());

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move {
            handle(
                &store,
                request(RequestKind::LatchWait, "ctx1", "slow").with_timeout_millis(0),
            )
            .await
        })
    };

    // Several bounded store awaits elapse before the count reaches zero.
    sleep(Duration::from_millis(120)).await;
    assert!(!waiter.is_finished());

    handle(&store, request(RequestKind::LatchDown, "ctx1", "slow")).await;

    assert_eq!(waiter.await.unwrap(), Reply::ok("true"));
    assert_eq!(store.latch_listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn bounded_latch_wait_times_out() {
    init_test_tracing();

    let store = memory_store();
    let set = request(RequestKind::LatchSet, "ctx1", "stuck").with_value("3");
    assert!(handle(&store, set).await.is_ok());

    let reply = handle(
        &store,
        request(RequestKind::LatchWait, "ctx1", "stuck").with_timeout_millis(50),
    )
    .await;

    assert_eq!(reply, Reply::error("TIMEOUT"));
    assert_eq!(store.latch_listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn destroyed_latch_fails_its_waiters() {
    init_test_tracing();

    let store = memory_store();
    let set = request(RequestKind::LatchSet, "ctx1", "doomed").with_value("1");
    assert!(handle(&store, set).await.is_ok());

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move {
            handle(&store, request(RequestKind::LatchWait, "ctx1", "doomed")).await
        })
    };

    wait_until("latch waiter subscribed", || store.latch_listener_count() == 1).await;
    store.latch("latch_ctx1_doomed").destroy().await.unwrap();

    let reply = waiter.await.unwrap();
    assert!(!reply.is_ok());
    assert!(!reply.is_timeout());
}

#[tokio::test(flavor = "multi_thread")]
async fn count_down_of_unknown_latch_is_a_no_op() {
    init_test_tracing();

    let store = memory_store();

    assert_eq!(
        handle(&store, request(RequestKind::LatchDown, "ctx1", "ghost")).await,
        Reply::ok("")
    );
    assert!(store.latch_names().is_empty());
}
