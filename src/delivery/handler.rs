//! Inbound message event handling.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::dispatcher::NotificationDispatcher;
use crate::events::{BrokerEvent, QueueDelivery};
use crate::pubsub::{PubSub, topics};

/// The single entry point for broker-originated `message_sent` events.
///
/// Consumes queue deliveries from the internal bus; payloads that are not
/// `message_sent` events belong to other consumers and are skipped. Handling
/// is fire-and-forget: no acknowledgment is awaited from the dispatcher or
/// the pub/sub bridge.
pub struct InboundMessageHandler {
    dispatcher: NotificationDispatcher,
    pubsub: PubSub,
}

impl InboundMessageHandler {
    pub fn new(dispatcher: NotificationDispatcher, pubsub: PubSub) -> Self {
        Self { dispatcher, pubsub }
    }

    /// Spawns the bus-consuming loop.
    pub fn spawn(self, rx: broadcast::Receiver<QueueDelivery>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    /// Consumes deliveries until the bus closes. A lagged receiver skips the
    /// missed deliveries and keeps going.
    pub async fn run(self, mut rx: broadcast::Receiver<QueueDelivery>) {
        loop {
            match rx.recv().await {
                Ok(delivery) => self.handle(&delivery),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("inbound handler lagged, skipped {n} deliveries");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Fans out one delivery: direct notification to the receiver, plus a
    /// broadcast on the conversation topic.
    ///
    /// Missing optional fields skip the corresponding sink rather than
    /// failing; a payload that does not parse as a broker event is ignored.
    pub fn handle(&self, delivery: &QueueDelivery) {
        let event: BrokerEvent = match serde_json::from_value(delivery.payload.clone()) {
            Ok(event) => event,
            Err(err) => {
                debug!("ignoring non-event payload on '{}': {err}", delivery.queue);
                return;
            }
        };
        if !event.is_message_sent() {
            return;
        }

        let message = &event.data;
        info!(
            "message_sent on '{}': sender={} receiver={} conversation={}",
            delivery.queue,
            message.sender_id.as_deref().unwrap_or("?"),
            message.receiver_id.as_deref().unwrap_or("?"),
            message.conversation_id.as_deref().unwrap_or("-"),
        );

        let payload = match serde_json::to_value(message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("failed to re-encode message payload: {err}");
                return;
            }
        };

        if let Some(receiver_id) = &message.receiver_id {
            self.dispatcher.send_to_user(receiver_id, &payload);
        } else {
            debug!("message_sent without receiver, skipping user notification");
        }

        if message.conversation_id.is_some() {
            self.pubsub
                .publish(topics::MESSAGE_RECEIVED_IN_CONVERSATION, payload);
        }
    }
}
