//! The `registry` module manages the set of active broker consumers per user.
//!
//! It owns every [`ConsumerHandle`](crate::broker::ConsumerHandle) it opens,
//! keyed by `(user, queue)`, so removing a registry entry is what releases
//! the broker binding. Consumed payloads are stamped and forwarded onto the
//! internal event bus.

pub mod queue;
pub mod registry;

pub use registry::{ActiveSubscription, SubscriptionRegistry};
