//! Shutdown coordination for the service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Broadcasts a single shutdown request to every long-running task.
///
/// Clones share state: triggering any clone notifies every subscriber, and
/// only the first trigger counts.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A receiver that resolves once shutdown is triggered.
    ///
    /// Subscribe before triggering; the broadcast is not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Request shutdown. Returns `false` if it was already requested.
    pub fn trigger(&self, reason: &str) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!(reason, "Shutdown already in progress");
            return false;
        }

        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(reason, subscribers = notified, "Shutdown requested");
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Tasks currently waiting on the signal.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_every_clone() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.clone().subscribe();
        assert_eq!(shutdown.subscriber_count(), 2);

        assert!(shutdown.clone().trigger("test"));

        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_only_first_trigger_counts() {
        let shutdown = Shutdown::default();
        assert!(!shutdown.is_triggered());

        assert!(shutdown.trigger("SIGTERM"));
        assert!(!shutdown.trigger("SIGINT"));
        assert!(shutdown.is_triggered());
    }
}
