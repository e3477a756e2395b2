//! Stopping the discovery loop.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};

use crate::discovery::{DiscoveryScheduler, Prober};

/// A discovery loop running on the runtime.
///
/// Dropping the handle leaves the loop running; call [`DiscoveryTask::stop`]
/// to end it and abort the probes it still has in flight.
pub struct DiscoveryTask {
    stop_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl DiscoveryTask {
    /// Spawn `scheduler`'s loop.
    pub fn spawn<P: Prober>(scheduler: Arc<DiscoveryScheduler<P>>) -> Self {
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let handle = tokio::spawn(scheduler.run(stop_rx));
        Self { stop_tx, handle }
    }

    /// Signal the loop and wait for it to exit.
    pub async fn stop(self) -> Result<(), JoinError> {
        // Fails only when the loop already exited and dropped its receiver.
        let _ = self.stop_tx.send(());
        self.handle.await
    }
}
