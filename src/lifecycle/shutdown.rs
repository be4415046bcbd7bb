//! Shutdown coordination for the daemon.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the serving loop and any
/// long-running tasks can subscribe to. Termination-signal handlers
/// trigger it; the serving hand-off returns once it fires.
#[derive(Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    ///
    /// A trigger is only observed by receivers that existed when it
    /// fired, so subscribe before the event source (signal handlers)
    /// is armed.
    pub fn subscribe(&self) -> ShutdownReceiver {
        ShutdownReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of the shutdown broadcast.
pub struct ShutdownReceiver {
    rx: broadcast::Receiver<()>,
}

impl ShutdownReceiver {
    /// Wait until shutdown has been triggered. Also completes if the
    /// coordinator is gone, which only happens when the process is
    /// already tearing down.
    pub async fn recv(&mut self) {
        // Lagged just means multiple triggers raced; both cases read as
        // "shutdown happened".
        let _ = self.rx.recv().await;
    }
}
