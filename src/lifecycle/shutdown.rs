//! Shutdown coordination for the gateway.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe and stop once `trigger` is called. A task
/// that subscribes after the trigger would never see the broadcast, so it
/// should check `is_triggered` first.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every subscriber. Only the first call broadcasts; later calls
    /// are ignored.
    pub fn trigger(&self, reason: &str) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!(reason, "Shutdown already in progress");
            return;
        }
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(reason, subscribers = notified, "Shutdown triggered");
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
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
    async fn test_trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger("test");

        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_second_trigger_is_ignored() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        shutdown.trigger("first");
        shutdown.trigger("second");

        assert!(rx.recv().await.is_ok());
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn test_trigger_without_subscribers() {
        let shutdown = Shutdown::default();
        shutdown.trigger("test");
        assert!(shutdown.is_triggered());
    }
}
