use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, SyncResult};
use crate::rendezvous::{Settled, WaitCondition, WaitOutcome, WaitTimeout, Watchable};
use crate::store::{EntryListener, Subscription};

/// Subscription and delivery queue of one wait.
///
/// Dropping it unsubscribes first and then drains whatever the listener queued in the meantime.
struct DeliveryQueue<T> {
    subscription: Option<Subscription>,
    receiver: mpsc::UnboundedReceiver<Settled<T>>,
}

impl<T> DeliveryQueue<T> {
    async fn next(&mut self, deadline: Option<Instant>) -> SyncResult<WaitOutcome<T>> {
        let received = match deadline {
            None => self.receiver.recv().await,
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, self.receiver.recv()).await {
                    Ok(received) => received,
                    Err(_) => return Ok(WaitOutcome::TimedOut),
                }
            }
        };

        match received {
            Some(settled) => Ok(settled.into()),
            // The store dropped the listener, which only happens when the resource is destroyed.
            None => bail!(
                ErrorKind::ResourceDestroyed,
                "Watched resource was destroyed while waiting"
            ),
        }
    }
}

impl<T> Drop for DeliveryQueue<T> {
    fn drop(&mut self) {
        drop(self.subscription.take());

        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }
}

/// Waits until `condition` accepts the state of `target`, or `timeout` elapses.
///
/// The subscription is registered before the snapshot read, so a change racing with the read is
/// still observed. Every event accepted by the condition is queued by the listener, the wait ends
/// on the first one. The subscription is released before this function returns, whatever the
/// outcome, and also when the returned future is dropped early.
pub async fn rendezvous<V, W, C>(
    target: &W,
    condition: C,
    timeout: WaitTimeout,
) -> SyncResult<WaitOutcome<C::Output>>
where
    V: Send + 'static,
    W: Watchable<V>,
    C: WaitCondition<V>,
{
    let deadline = match timeout {
        WaitTimeout::Indefinite => None,
        WaitTimeout::Bounded(duration) => Some(Instant::now() + duration),
    };

    let condition = Arc::new(condition);
    let (sender, receiver) = mpsc::unbounded_channel();

    let listener_condition = condition.clone();
    let listener: EntryListener<V> = Arc::new(move |event| {
        if let Some(settled) = listener_condition.on_event(event) {
            // The receiver is closed once the wait is over, late events are dropped.
            let _ = sender.send(settled);
        }
    });

    let subscription = target.watch(listener).await?;
    let mut queue = DeliveryQueue {
        subscription: Some(subscription),
        receiver,
    };

    if let Some(settled) = condition.on_snapshot(target.snapshot().await?)? {
        debug!(target = %target.target(), "wait satisfied by snapshot");
        return Ok(settled.into());
    }

    debug!(target = %target.target(), ?timeout, "waiting for change");
    let outcome = queue.next(deadline).await?;

    if matches!(outcome, WaitOutcome::TimedOut) {
        debug!(target = %target.target(), ?timeout, "wait timed out");
    }

    Ok(outcome)
}
