//! Topic registry and publish path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::subscription::Subscription;

/// Topic names produced by the delivery core.
pub mod topics {
    /// Global feed of delivered messages.
    pub const MESSAGE_RECEIVED: &str = "messageReceived";
    /// Conversation-scoped feed of delivered messages.
    pub const MESSAGE_RECEIVED_IN_CONVERSATION: &str = "messageReceivedInConversation";
}

pub(super) struct Listener {
    pub(super) id: Uuid,
    pub(super) tx: mpsc::UnboundedSender<Value>,
}

/// In-process publish/subscribe bridge.
///
/// Cloneable; all clones share one topic table.
#[derive(Clone, Default)]
pub struct PubSub {
    pub(super) listeners: Arc<Mutex<HashMap<String, Vec<Listener>>>>,
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `payload` to every listener currently registered on
    /// `trigger`, in registration order.
    ///
    /// Listeners registered after this call do not receive the payload, and
    /// listeners whose receiving side is gone are pruned. No listeners at
    /// all is not an error; the payload is simply dropped.
    pub fn publish(&self, trigger: &str, payload: Value) {
        let mut listeners = self.listeners.lock().unwrap();
        let Some(registered) = listeners.get_mut(trigger) else {
            debug!("no listeners on '{trigger}', payload dropped");
            return;
        };
        registered.retain(|listener| listener.tx.send(payload.clone()).is_ok());
        if registered.is_empty() {
            debug!("no listeners on '{trigger}', payload dropped");
        }
    }

    /// Registers one listener under each trigger name and returns the
    /// payload stream.
    ///
    /// The stream is infinite and FIFO per trigger; it ends only when the
    /// returned [`Subscription`] is dropped, which also deregisters the
    /// listener.
    pub fn subscribe(&self, triggers: &[&str]) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut listeners = self.listeners.lock().unwrap();
        for trigger in triggers {
            listeners
                .entry(trigger.to_string())
                .or_default()
                .push(Listener { id, tx: tx.clone() });
        }

        Subscription::new(
            id,
            triggers.iter().map(|t| t.to_string()).collect(),
            rx,
            Arc::clone(&self.listeners),
        )
    }

    /// Number of listeners currently registered on `trigger`.
    pub fn listener_count(&self, trigger: &str) -> usize {
        let listeners = self.listeners.lock().unwrap();
        listeners.get(trigger).map_or(0, |l| l.len())
    }
}
