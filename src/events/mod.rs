//! The `events` module carries the internal event bus and the wire shapes of
//! broker-originated events.
//!
//! Every payload consumed from a broker queue is stamped with the owning
//! `(user, queue)` pair and a receipt timestamp, then published on the
//! [`EventBus`] as a [`QueueDelivery`]. The inbound message handler and the
//! WebSocket transport both consume the bus independently.

pub mod bus;
pub mod message;

pub use bus::EventBus;
pub use message::{BrokerEvent, MessagePayload, QueueDelivery};

#[cfg(test)]
mod tests;
