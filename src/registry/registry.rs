//! Broker subscription registry.
//!
//! Tracks, per user, which broker queues they are subscribed to, and owns the
//! consumer handle for each `(user, queue)` pair. All mutation happens under
//! one lock, and the lock is held across the broker attach, so a duplicate
//! subscribe can never race between the existence check and the insert.
//!
//! Per-pair lifecycle: `UNSUBSCRIBED → SUBSCRIBED → UNSUBSCRIBED`. A failed
//! attach leaves the pair unsubscribed and surfaces the error to the caller;
//! there is no retry state.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::queue;
use crate::broker::{ConsumerHandle, DeliveryHandler, QueueBroker};
use crate::events::{EventBus, QueueDelivery};
use crate::utils::error::SubscribeError;

/// One user's entry in the observability snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSubscription {
    pub user_id: String,
    pub queues: Vec<String>,
}

#[derive(Default)]
struct RegistryState {
    /// Ownership table: the consumer handle for each active pair.
    handles: HashMap<(String, String), ConsumerHandle>,
    /// Per-user queue names in subscription order.
    users: HashMap<String, Vec<String>>,
}

/// Manages the set of active broker consumers per user.
pub struct SubscriptionRegistry {
    broker: Arc<dyn QueueBroker>,
    bus: EventBus,
    state: Mutex<RegistryState>,
}

impl SubscriptionRegistry {
    pub fn new(broker: Arc<dyn QueueBroker>, bus: EventBus) -> Self {
        Self {
            broker,
            bus,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Subscribes a user to their personal queues (messages, status, typing,
    /// friends, conversations).
    ///
    /// Idempotent per `(user, queue)` pair: pairs that are already active are
    /// skipped. Returns the user's full queue list. The first failing attach
    /// aborts the loop and is returned; pairs attached earlier in the same
    /// call stay active.
    pub async fn subscribe_user_to_queues(
        &self,
        user_id: &str,
    ) -> Result<Vec<String>, SubscribeError> {
        let mut state = self.state.lock().await;
        for queue_name in queue::personal_queues(user_id) {
            self.subscribe_to_queue(&mut state, user_id, &queue_name)
                .await?;
        }
        Ok(state.users.get(user_id).cloned().unwrap_or_default())
    }

    /// Subscribes a user to a conversation-scoped queue, additively to any
    /// existing subscriptions.
    ///
    /// A duplicate call for the same conversation is a no-op rather than a
    /// second consumer. Returns the user's full queue list.
    pub async fn subscribe_to_conversation_queue(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<String>, SubscribeError> {
        let queue_name = queue::conversation_queue(conversation_id);
        let mut state = self.state.lock().await;
        self.subscribe_to_queue(&mut state, user_id, &queue_name)
            .await?;
        Ok(state.users.get(user_id).cloned().unwrap_or_default())
    }

    /// Closes every consumer owned for `user_id` and removes the user's
    /// entry entirely. Returns the queue names that were closed; an unknown
    /// user yields an empty list.
    pub async fn unsubscribe_user(&self, user_id: &str) -> Vec<String> {
        let mut state = self.state.lock().await;
        let queues = state.users.remove(user_id).unwrap_or_default();
        for queue_name in &queues {
            if let Some(handle) = state
                .handles
                .remove(&(user_id.to_string(), queue_name.clone()))
            {
                handle.cancel();
            }
        }
        if !queues.is_empty() {
            info!("unsubscribed user '{user_id}' from {} queues", queues.len());
        }
        queues
    }

    /// Read-only snapshot of every user's queue list, ordered by user id.
    pub async fn active_subscriptions(&self) -> Vec<ActiveSubscription> {
        let state = self.state.lock().await;
        let mut snapshot: Vec<ActiveSubscription> = state
            .users
            .iter()
            .map(|(user_id, queues)| ActiveSubscription {
                user_id: user_id.clone(),
                queues: queues.clone(),
            })
            .collect();
        snapshot.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        snapshot
    }

    /// Reserves the `(user, queue)` pair and attaches a broker consumer
    /// whose callback stamps every payload with the pair and a receipt
    /// timestamp, then forwards it onto the event bus.
    ///
    /// Returns `false` when the pair was already active. On broker failure
    /// nothing is recorded and the error propagates.
    async fn subscribe_to_queue(
        &self,
        state: &mut RegistryState,
        user_id: &str,
        queue_name: &str,
    ) -> Result<bool, SubscribeError> {
        let key = (user_id.to_string(), queue_name.to_string());
        if state.handles.contains_key(&key) {
            debug!("user '{user_id}' is already subscribed to '{queue_name}'");
            return Ok(false);
        }

        let bus = self.bus.clone();
        let uid = user_id.to_string();
        let qname = queue_name.to_string();
        let handler: DeliveryHandler = Arc::new(move |payload| {
            bus.publish(QueueDelivery::now(&uid, &qname, payload));
        });

        let handle = self
            .broker
            .consume(queue_name, handler)
            .await
            .map_err(|source| SubscribeError::Broker {
                user_id: user_id.to_string(),
                queue: queue_name.to_string(),
                source,
            })?;

        state.handles.insert(key, handle);
        state
            .users
            .entry(user_id.to_string())
            .or_default()
            .push(queue_name.to_string());
        info!("user '{user_id}' subscribed to '{queue_name}'");
        Ok(true)
    }
}
