use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, SyncResult};
use crate::names::checkpoint_map_name;
use crate::rendezvous::conditions::CheckpointValue;
use crate::rendezvous::{MapKey, WaitOutcome, WaitTimeout, rendezvous};
use crate::store::{ClusterStore, ObservableMap};
use crate::types::{Reply, Request};

/// Key of a checkpoint in the checkpoint map of a context.
#[derive(Debug, Clone)]
struct CheckpointKey {
    map_name: String,
    key: String,
}

impl CheckpointKey {
    fn from_request(request: &Request) -> SyncResult<Self> {
        if request.selector.is_empty() {
            bail!(ErrorKind::ValidationError, "Key must be non-empty");
        }

        Ok(Self {
            map_name: checkpoint_map_name(&request.context_id),
            key: request.selector.clone(),
        })
    }
}

/// Reads a checkpoint, answering OK without a value when it was never set.
#[derive(Debug)]
pub struct GetAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> GetAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        let checkpoint = CheckpointKey::from_request(&self.request)?;
        let map = self.store.map(&checkpoint.map_name);

        match map.get(&checkpoint.key).await? {
            Some(value) => Ok(Reply::ok(value)),
            None => Ok(Reply::ok_absent()),
        }
    }
}

/// Writes a checkpoint and answers with the value it replaced.
#[derive(Debug)]
pub struct SetAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> SetAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        let checkpoint = CheckpointKey::from_request(&self.request)?;
        let map = self.store.map(&checkpoint.map_name);
        let value = self.request.value.unwrap_or_default();

        debug!(map = %checkpoint.map_name, key = %checkpoint.key, "setting checkpoint");
        let previous = map.put(&checkpoint.key, value).await?;

        Ok(Reply::ok(previous.unwrap_or_default()))
    }
}

/// Waits until a checkpoint has a value.
#[derive(Debug)]
pub struct WaitAction<S> {
    store: S,
    request: Request,
}

impl<S: ClusterStore> WaitAction<S> {
    pub fn new(store: S, request: Request) -> Self {
        Self { store, request }
    }

    pub async fn execute(self) -> SyncResult<Reply> {
        let checkpoint = CheckpointKey::from_request(&self.request)?;
        let map = self.store.map(&checkpoint.map_name);
        let timeout = self.request.timeout();

        let outcome = rendezvous(
            &MapKey::new(&map, &checkpoint.key),
            CheckpointValue,
            timeout,
        )
        .await?;

        match outcome {
            WaitOutcome::Ready(value) => Ok(Reply::ok(value)),
            WaitOutcome::Failed(failure) => Ok(Reply::error(failure.as_str())),
            WaitOutcome::TimedOut => bail!(
                ErrorKind::WaitTimeout,
                "Checkpoint wait timed out",
                detail = timeout_detail(&checkpoint, timeout)
            ),
        }
    }
}

fn timeout_detail(checkpoint: &CheckpointKey, timeout: WaitTimeout) -> String {
    format!("{}/{} after {timeout:?}", checkpoint.map_name, checkpoint.key)
}
