//! Wire shapes of broker events and bus deliveries.
//!
//! Broker payloads use camelCase field names on the wire. Parsing is lenient:
//! every field of a `message_sent` payload other than the envelope itself is
//! optional, and unknown fields are carried through untouched so downstream
//! consumers see the full payload.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name of a broker message-sent event.
pub const MESSAGE_SENT: &str = "message_sent";

/// A payload consumed from a broker queue, stamped with the owning
/// subscription and a receipt timestamp. This is the `queue.message` event
/// carried by the internal bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDelivery {
    pub user_id: String,
    pub queue: String,
    pub payload: Value,
    /// Receipt time in epoch milliseconds.
    pub received_at: i64,
}

impl QueueDelivery {
    /// Stamps `payload` with the receiving `(user, queue)` pair and the
    /// current time.
    pub fn now(user_id: &str, queue: &str, payload: Value) -> Self {
        Self {
            user_id: user_id.to_string(),
            queue: queue.to_string(),
            payload,
            received_at: Utc::now().timestamp_millis(),
        }
    }
}

/// Envelope of an event consumed from a broker queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerEvent {
    pub event: String,
    #[serde(default)]
    pub data: MessagePayload,
}

impl BrokerEvent {
    /// Wraps a message payload in a `message_sent` envelope.
    pub fn message_sent(data: MessagePayload) -> Self {
        Self {
            event: MESSAGE_SENT.to_string(),
            data,
        }
    }

    pub fn is_message_sent(&self) -> bool {
        self.event == MESSAGE_SENT
    }
}

/// The body of a `message_sent` event.
///
/// All fields are optional on the wire; a malformed payload degrades to
/// `None` fields rather than a parse failure. Fields not named here are
/// preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
