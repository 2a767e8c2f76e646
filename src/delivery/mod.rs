//! The `delivery` module is the fan-out path for broker-originated messages.
//!
//! The [`InboundMessageHandler`] is the single entry point for `message_sent`
//! events: it forwards each message to the receiving user via the
//! [`NotificationDispatcher`] and broadcasts it on the conversation-scoped
//! pub/sub topic. Delivery is fire-and-forget; neither sink acknowledges.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::NotificationDispatcher;
pub use handler::InboundMessageHandler;

#[cfg(test)]
mod tests;
