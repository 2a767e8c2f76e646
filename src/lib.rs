//! # Courier
//!
//! `courier` is the real-time delivery core of a messaging system. Messages
//! are produced into broker queues, consumed by per-user queue subscriptions,
//! and fanned out two ways: a direct notification to the receiving user's
//! live connections, and a broadcast onto pub/sub topics consumed by
//! streaming subscribers.
//!
//! ## Core Modules
//!
//! - `broker`: the queue broker abstraction and the in-memory implementation
//!   providing durable FIFO queues with single consumers.
//! - `registry`: tracks which broker queues each user is subscribed to and
//!   owns the consumer handles.
//! - `events`: the internal event bus plus the wire shapes of broker events.
//! - `delivery`: the inbound message handler and the notification dispatcher.
//! - `pubsub`: the in-process publish/subscribe bridge feeding streaming
//!   subscription clients.
//! - `transport`: the WebSocket server that plays the live-connection side.
//! - `persistence`: the message store collaborator contract and its
//!   sled-backed implementation.
//! - `config`: layered configuration loading.
//! - `utils`: logging setup and shared error types.

pub mod broker;
pub mod config;
pub mod delivery;
pub mod events;
pub mod persistence;
pub mod pubsub;
pub mod registry;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
