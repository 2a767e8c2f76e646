//! Per-user notification dispatch.

use serde_json::{Value, json};
use tracing::info;

use crate::pubsub::{PubSub, topics};

/// Delivers a single message to a specific user's live sessions.
///
/// Best-effort, at-most-once: there is no check that the user has an active
/// listener and no queueing or retry. With nobody listening on the topic the
/// payload is dropped.
#[derive(Clone)]
pub struct NotificationDispatcher {
    pubsub: PubSub,
}

impl NotificationDispatcher {
    pub fn new(pubsub: PubSub) -> Self {
        Self { pubsub }
    }

    /// Publishes a user-addressed payload on the global `messageReceived`
    /// topic.
    pub fn send_to_user(&self, user_id: &str, message: &Value) {
        info!("notifying user '{user_id}'");
        self.pubsub.publish(
            topics::MESSAGE_RECEIVED,
            json!({
                "userId": user_id,
                "message": message,
            }),
        );
    }
}
