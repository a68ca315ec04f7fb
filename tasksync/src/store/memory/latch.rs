use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, SyncResult};
use crate::rendezvous::conditions::LatchZero;
use crate::rendezvous::{MapKey, WaitOutcome, WaitTimeout, rendezvous};
use crate::store::memory::MemoryMap;
use crate::store::{CountDownLatch, ObservableMap};

/// In-memory [`CountDownLatch`].
///
/// All latches of a store share one counter map keyed by latch name, so the latch itself is only
/// a name and a handle to that map.
#[derive(Debug, Clone)]
pub struct MemoryLatch {
    name: Arc<str>,
    counts: MemoryMap<u32>,
    max_await: Duration,
}

impl MemoryLatch {
    pub(super) fn new(name: &str, counts: MemoryMap<u32>, max_await: Duration) -> Self {
        Self {
            name: name.into(),
            counts,
            max_await,
        }
    }
}

impl CountDownLatch for MemoryLatch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count(&self) -> SyncResult<Option<u32>> {
        self.counts.get(&self.name).await
    }

    async fn set_count(&self, count: u32) -> SyncResult<bool> {
        let armed = self
            .counts
            .compute(&self.name, |current| match current {
                None | Some(0) => Some(count),
                Some(_) => None,
            });

        debug!(latch = %self.name, count, armed, "latch set");

        Ok(armed)
    }

    async fn count_down(&self) -> SyncResult<()> {
        self.counts.compute(&self.name, |current| match current {
            Some(count) if *count > 0 => Some(count - 1),
            _ => None,
        });

        Ok(())
    }

    async fn await_zero(&self, timeout: Option<Duration>) -> SyncResult<bool> {
        let bounded = timeout.map_or(self.max_await, |timeout| timeout.min(self.max_await));

        let outcome = rendezvous(
            &MapKey::new(&self.counts, &self.name),
            LatchZero,
            WaitTimeout::Bounded(bounded),
        )
        .await?;

        match outcome {
            WaitOutcome::Ready(()) => Ok(true),
            WaitOutcome::TimedOut => Ok(false),
            WaitOutcome::Failed(failure) => bail!(
                ErrorKind::ResourceDestroyed,
                "Latch was destroyed while waiting",
                format!("{}: {failure}", self.name)
            ),
        }
    }

    async fn destroy(&self) -> SyncResult<()> {
        self.counts.remove(&self.name).await?;

        Ok(())
    }
}
