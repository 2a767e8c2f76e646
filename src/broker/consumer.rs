//! Broker consumer contract.
//!
//! A consumer is attached with [`QueueBroker::consume`] and stays attached
//! for as long as the returned [`ConsumerHandle`] is alive. Cancelling or
//! dropping the handle detaches the consumer, so whoever owns the handle
//! owns the subscription.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::utils::error::BrokerError;

/// Callback invoked once per delivered payload.
///
/// Invoked inline on the delivering task; implementations must not call back
/// into the broker and should hand the payload off without blocking.
pub type DeliveryHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// An AMQP-style queue broker: durable named queues, FIFO delivery,
/// acknowledged on receipt.
#[async_trait]
pub trait QueueBroker: Send + Sync {
    /// Enqueues a payload onto `queue`, declaring the queue if needed.
    ///
    /// With no consumer attached the payload is retained as backlog and
    /// redelivered when a consumer attaches.
    async fn publish(&self, queue: &str, payload: Value) -> Result<(), BrokerError>;

    /// Attaches the single consumer for `queue`.
    ///
    /// Any backlog is delivered first, then live publishes, all in FIFO
    /// order. Fails with [`BrokerError::QueueBusy`] if the queue already has
    /// a consumer.
    async fn consume(&self, queue: &str, handler: DeliveryHandler)
    -> Result<ConsumerHandle, BrokerError>;
}

/// Owned handle to an attached consumer.
///
/// Dropping the handle detaches the consumer, which guarantees the broker
/// binding is released whenever the owning registry entry is removed.
pub struct ConsumerHandle {
    queue: String,
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl ConsumerHandle {
    /// Builds a handle around a broker-specific detach action.
    pub fn new(queue: impl Into<String>, detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            queue: queue.into(),
            detach: Some(Box::new(detach)),
        }
    }

    /// The queue this consumer is attached to.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Detaches the consumer. Equivalent to dropping the handle.
    pub fn cancel(mut self) {
        self.run_detach();
    }

    fn run_detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        self.run_detach();
    }
}

impl std::fmt::Debug for ConsumerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerHandle")
            .field("queue", &self.queue)
            .finish()
    }
}
