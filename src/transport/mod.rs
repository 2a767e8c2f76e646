//! The `transport` module is the live-connection side of the delivery core.
//!
//! It defines the JSON protocol spoken by clients and implements the
//! WebSocket server: identified connections get their broker queue
//! subscriptions managed for them and receive their queue deliveries as
//! `queue.message` frames; any connection can produce messages and attach
//! pub/sub topic streams.

pub mod message;
pub mod websocket;

pub use message::{ClientMessage, ServerMessage};
pub use websocket::{Connection, ServiceState, start_websocket_server};

#[cfg(test)]
mod tests;
