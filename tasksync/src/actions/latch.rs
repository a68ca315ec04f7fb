use tokio::time::Instant;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, SyncResult};
use crate::names::latch_name;
use crate::rendezvous::WaitTimeout;
use crate::store::{ClusterStore, CountDownLatch};
use crate::types::{Reply, Request};

fn latch_of<S: ClusterStore>(store: &S, request: &Request) -> S::Latch {
    store.latch(&latch_name(&request.context_id, &request.selector))
}

/// Arms a latch to the count carried in the request value.
#[derive(Debug)]
pub struct LatchSetAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> LatchSetAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        let raw = self.request.value.as_deref().unwrap_or_default().trim();
        let Ok(count) = raw.parse::<u32>() else {
            bail!(
                ErrorKind::ValidationError,
                "Latch count must be a non-negative integer",
                raw
            );
        };

        let latch = latch_of(&self.store, &self.request);
        if !latch.set_count(count).await? {
            bail!(
                ErrorKind::InvalidState,
                "Latch is still counting down",
                latch.name()
            );
        }

        Ok(Reply::ok_empty())
    }
}

/// Counts a latch down by one.
#[derive(Debug)]
pub struct LatchDownAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> LatchDownAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        latch_of(&self.store, &self.request).count_down().await?;

        Ok(Reply::ok_empty())
    }
}

/// Answers whether a latch is still counting down.
#[derive(Debug)]
pub struct LatchHasCountAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> LatchHasCountAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        let latch = latch_of(&self.store, &self.request);

        match latch.count().await? {
            Some(count) => Ok(Reply::ok((count > 0).to_string())),
            None => bail!(ErrorKind::NotFound, "Latch not found", latch.name()),
        }
    }
}

/// Waits until a latch reaches zero.
///
/// A single await of the store is bounded, so the wait is made of as many awaits as needed to
/// cover the requested timeout, or of awaits repeated for as long as the latch has a count when
/// the request waits indefinitely.
///
/// A bounded request loops too: the store caps each await below the caller's timeout, and the
/// caller must not get a TIMEOUT before its own deadline.
#[derive(Debug)]
pub struct LatchWaitAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> LatchWaitAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        let latch = latch_of(&self.store, &self.request);

        match self.request.timeout() {
            WaitTimeout::Indefinite => {
                while latch.has_count().await? {
                    debug!(latch = %latch.name(), "awaiting latch");
                    latch.await_zero(None).await?;
                }
            }
            WaitTimeout::Bounded(timeout) => {
                let deadline = Instant::now() + timeout;
                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if latch.await_zero(Some(remaining)).await? {
                        break;
                    }
                    if Instant::now() >= deadline {
                        bail!(
                            ErrorKind::WaitTimeout,
                            "Latch wait timed out",
                            latch.name()
                        );
                    }
                }
            }
        }

        Ok(Reply::ok(true.to_string()))
    }
}
