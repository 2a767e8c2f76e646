use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::QueueDelivery;
use crate::registry::ActiveSubscription;

/// Frames sent by clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Binds the connection to a user and subscribes their personal queues.
    #[serde(rename = "identify")]
    Identify { user_id: String },

    /// Additive conversation-queue subscription for the identified user.
    #[serde(rename = "join_conversation")]
    JoinConversation { conversation_id: String },

    /// Producer side: enqueue a raw payload onto a broker queue.
    #[serde(rename = "publish")]
    Publish { queue: String, payload: Value },

    /// Producer convenience: wrap the fields into a `message_sent` event and
    /// route it to the receiver's messages queue, or to the conversation
    /// queue when there is no direct receiver.
    #[serde(rename = "send_message")]
    SendMessage {
        content: String,
        #[serde(default)]
        receiver_id: Option<String>,
        #[serde(default)]
        conversation_id: Option<String>,
    },

    /// Attaches a pub/sub subscription for the given topics and streams its
    /// payloads down this connection.
    #[serde(rename = "stream")]
    Stream { topics: Vec<String> },

    /// Observability: asks for the active-subscriptions snapshot.
    #[serde(rename = "subscriptions")]
    Subscriptions,
}

/// Frames sent by the server.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// A queue delivery for the identified user.
    #[serde(rename = "queue.message")]
    QueueMessage {
        #[serde(flatten)]
        delivery: QueueDelivery,
    },

    /// A payload published on a streamed pub/sub topic.
    #[serde(rename = "event")]
    Event { payload: Value },

    /// Reply to a `subscriptions` query.
    #[serde(rename = "subscriptions")]
    Subscriptions { active: Vec<ActiveSubscription> },
}
