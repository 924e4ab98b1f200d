//! Host lifecycle signal.
//!
//! The host owns a [`LifecycleSignal`] and calls [`backgrounded`] and
//! [`foregrounded`] as the app moves between states. A client opened with
//! [`SyncClient::open_with_lifecycle`] subscribes to it for its whole life.
//!
//! [`backgrounded`]: LifecycleSignal::backgrounded
//! [`foregrounded`]: LifecycleSignal::foregrounded
//! [`SyncClient::open_with_lifecycle`]: crate::SyncClient::open_with_lifecycle

use docsync_core::LifecycleEvent;
use tokio::sync::broadcast;

const SIGNAL_CAPACITY: usize = 16;

/// Broadcasts app background/foreground transitions to clients.
#[derive(Debug, Clone)]
pub struct LifecycleSignal {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleSignal {
    /// Create a signal with no listeners.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { tx }
    }

    /// Report that the app moved to the background.
    pub fn backgrounded(&self) {
        self.emit(LifecycleEvent::Backgrounded);
    }

    /// Report that the app returned to the foreground.
    pub fn foregrounded(&self) {
        self.emit(LifecycleEvent::Foregrounded);
    }

    /// Deliver an event to every subscriber.
    ///
    /// An event with no subscribers is dropped.
    pub fn emit(&self, event: LifecycleEvent) {
        let _ = self.tx.send(event);
    }

    /// Receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LifecycleSignal {
    fn default() -> Self {
        Self::new()
    }
}
