//! Internal event bus for queue deliveries.
//!
//! [`EventBus`] is a thin wrapper around [`tokio::sync::broadcast`]. Queue
//! consumers publish every received payload here; the inbound message handler
//! and the WebSocket transport each hold their own receiver.
//!
//! - Publishing never blocks and never fails: with no receivers attached the
//!   delivery is dropped.
//! - There is no replay. A receiver only observes deliveries published after
//!   it subscribed, and a lagging receiver skips the oldest items
//!   (`RecvError::Lagged`).

use tokio::sync::broadcast;

use super::message::QueueDelivery;

/// Broadcast channel for [`QueueDelivery`] events.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<QueueDelivery>,
}

impl EventBus {
    /// Creates a new bus with the given channel capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a delivery to all active receivers.
    ///
    /// Errors are ignored if there are no active receivers.
    pub fn publish(&self, delivery: QueueDelivery) {
        let _ = self.tx.send(delivery);
    }

    /// Subscribes to the bus and returns a new receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueDelivery> {
        self.tx.subscribe()
    }

    /// Number of receivers currently attached.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
