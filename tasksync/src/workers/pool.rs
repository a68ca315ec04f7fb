use std::mem;
use std::sync::Arc;

use config::shared::WorkerPoolConfig;
use tokio::sync::{Mutex, Semaphore, mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::actions::ActionDispatcher;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::ErrorKind;
use crate::store::ClusterStore;
use crate::sync_error;
use crate::types::{Reply, Request};

/// A request together with the channel its reply is sent on.
pub type PendingRequest = (Request, oneshot::Sender<Reply>);

fn interrupted_reply() -> Reply {
    Reply::from(&sync_error!(
        ErrorKind::Interrupted,
        "Request handling was interrupted"
    ))
}

/// Receiving end of the reply to one submitted request.
#[derive(Debug)]
pub struct ReplyHandle {
    receiver: oneshot::Receiver<Reply>,
}

impl ReplyHandle {
    /// Waits for the reply.
    ///
    /// A request whose worker went away without answering is answered with an ERROR reply.
    pub async fn reply(self) -> Reply {
        self.receiver.await.unwrap_or_else(|_| interrupted_reply())
    }
}

/// Internal state for [`RequestWorkerPool`].
#[derive(Debug, Default)]
struct RequestWorkerPoolInner {
    /// Owns all spawned request tasks.
    join_set: JoinSet<()>,
}

/// Runs every request on its own task.
///
/// The number of prompt requests handled at the same time is bounded by
/// [`WorkerPoolConfig::max_concurrent_requests`]; requests above the bound wait for a slot
/// before their action starts. Waiting requests never take a slot, since the request that
/// releases them must always be able to run. A panicking action is answered with an ERROR
/// reply.
#[derive(Debug, Clone)]
pub struct RequestWorkerPool<S> {
    store: S,
    dispatcher: Arc<ActionDispatcher>,
    permits: Arc<Semaphore>,
    inner: Arc<Mutex<RequestWorkerPoolInner>>,
}

impl<S> RequestWorkerPool<S>
where
    S: ClusterStore,
{
    pub fn new(store: S, config: &WorkerPoolConfig) -> Self {
        Self {
            store,
            dispatcher: Arc::new(ActionDispatcher::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            inner: Arc::new(Mutex::new(RequestWorkerPoolInner::default())),
        }
    }

    /// Number of prompt requests currently allowed to start.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Handles `request` in the background and returns a handle to its reply.
    pub async fn submit(&self, request: Request) -> ReplyHandle {
        let (reply_tx, receiver) = oneshot::channel();
        self.spawn(request, reply_tx).await;

        ReplyHandle { receiver }
    }

    /// Handles requests from `requests` until the channel closes or shutdown is signalled.
    ///
    /// Requests already accepted keep running after this returns; use [`Self::wait_all`] to
    /// wait for them.
    pub async fn serve(
        &self,
        mut requests: mpsc::Receiver<PendingRequest>,
        mut shutdown_rx: ShutdownRx,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    info!("shutting down request worker pool, no new requests are accepted");
                    break;
                }
                next = requests.recv() => {
                    let Some((request, reply_tx)) = next else {
                        debug!("request channel closed");
                        break;
                    };
                    self.spawn(request, reply_tx).await;
                }
            }
        }
    }

    /// Waits until every request spawned so far has been answered.
    pub async fn wait_all(&self) {
        loop {
            let mut join_set = {
                let mut inner = self.inner.lock().await;
                mem::take(&mut inner.join_set)
            };

            if join_set.is_empty() {
                break;
            }

            while let Some(result) = join_set.join_next().await {
                if let Err(err) = result {
                    if err.is_cancelled() {
                        debug!("request task was cancelled");
                    } else {
                        error!(error = %err, "request task panicked");
                    }
                }
            }
        }
    }

    async fn spawn(&self, request: Request, reply_tx: oneshot::Sender<Reply>) {
        let action = self.dispatcher.dispatch(self.store.clone(), request);
        let permits = match action.kind() {
            Some(kind) if kind.is_wait() => None,
            _ => Some(self.permits.clone()),
        };

        let mut inner = self.inner.lock().await;
        // Reap answered requests so the set only tracks in-flight ones.
        while inner.join_set.try_join_next().is_some() {}

        inner.join_set.spawn(async move {
            let _permit = match permits {
                Some(permits) => match permits.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        let _ = reply_tx.send(interrupted_reply());
                        return;
                    }
                },
                None => None,
            };

            let kind = action.kind();
            let reply = match tokio::spawn(action.handle()).await {
                Ok(reply) => reply,
                Err(err) => {
                    error!(?kind, error = %err, "request handler did not complete");
                    interrupted_reply()
                }
            };

            // The requester may have stopped waiting, the reply is dropped then.
            let _ = reply_tx.send(reply);
        });
    }
}
