//! The `pubsub` module is the in-process publish/subscribe bridge between
//! broker events and streaming subscription clients.
//!
//! Topics are best-effort broadcast: a publish reaches every listener
//! registered at that moment, there is no buffering or replay, and zero
//! listeners is not an error.

pub mod bridge;
pub mod subscription;

pub use bridge::{PubSub, topics};
pub use subscription::Subscription;
