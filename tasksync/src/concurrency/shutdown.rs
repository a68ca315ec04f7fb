//! Broadcast shutdown signal for request workers.

use tokio::sync::watch;

/// Receiver side of the shutdown signal.
///
/// [`watch::Receiver::changed`] resolves once shutdown was requested, or once every
/// [`ShutdownTx`] was dropped.
pub type ShutdownRx = watch::Receiver<()>;

/// Transmitter side of the shutdown signal, cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    /// Notifies every subscribed receiver.
    ///
    /// Fails when no receiver is alive anymore.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Returns a new receiver that only observes signals sent after this call.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Creates a shutdown channel with one receiver.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(tx), rx)
}
