//! The listener side of a topic subscription.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::bridge::Listener;

/// A lazy, infinite sequence of payloads published on one or more triggers.
///
/// Payloads arrive in publish order per trigger. Dropping the subscription
/// deregisters its listener from every trigger it was attached to, which is
/// how a disconnecting client ends its stream.
pub struct Subscription {
    id: Uuid,
    triggers: Vec<String>,
    rx: mpsc::UnboundedReceiver<Value>,
    listeners: Arc<Mutex<HashMap<String, Vec<Listener>>>>,
}

impl Subscription {
    pub(super) fn new(
        id: Uuid,
        triggers: Vec<String>,
        rx: mpsc::UnboundedReceiver<Value>,
        listeners: Arc<Mutex<HashMap<String, Vec<Listener>>>>,
    ) -> Self {
        Self {
            id,
            triggers,
            rx,
            listeners,
        }
    }

    /// Triggers this subscription listens on.
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    /// Waits for the next published payload.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Value>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut listeners = self.listeners.lock().unwrap();
        for trigger in &self.triggers {
            if let Some(registered) = listeners.get_mut(trigger) {
                registered.retain(|listener| listener.id != self.id);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("triggers", &self.triggers)
            .finish()
    }
}
