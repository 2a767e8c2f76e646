//! In-memory queue broker.
//!
//! Queues are declared on first use and never dropped. Payloads published to
//! a queue with no consumer accumulate as backlog (durable-queue behavior);
//! attaching a consumer drains the backlog in order before live deliveries
//! resume. A queue has at most one consumer at a time.
//!
//! Deliveries run inline under the broker lock, which is what makes the
//! FIFO guarantee hold across the backlog/live boundary. Delivery handlers
//! must therefore not call back into the broker.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::consumer::{ConsumerHandle, DeliveryHandler, QueueBroker};
use crate::utils::error::BrokerError;

#[derive(Default)]
struct QueueState {
    backlog: VecDeque<Value>,
    consumer: Option<Consumer>,
}

struct Consumer {
    id: u64,
    handler: DeliveryHandler,
}

#[derive(Default)]
struct Shared {
    queues: HashMap<String, QueueState>,
    next_consumer_id: u64,
    closed: bool,
}

/// In-process [`QueueBroker`] implementation.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the broker: detaches all consumers and rejects further
    /// publishes and consumes.
    pub fn close(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.closed = true;
        for state in shared.queues.values_mut() {
            state.consumer = None;
        }
    }

    /// Number of payloads retained for `queue` awaiting a consumer.
    pub fn backlog_len(&self, queue: &str) -> usize {
        let shared = self.shared.lock().unwrap();
        shared.queues.get(queue).map_or(0, |s| s.backlog.len())
    }

    /// Whether `queue` currently has a consumer attached.
    pub fn has_consumer(&self, queue: &str) -> bool {
        let shared = self.shared.lock().unwrap();
        shared.queues.get(queue).is_some_and(|s| s.consumer.is_some())
    }
}

#[async_trait]
impl QueueBroker for MemoryBroker {
    async fn publish(&self, queue: &str, payload: Value) -> Result<(), BrokerError> {
        let mut shared = self.shared.lock().unwrap();
        if shared.closed {
            return Err(BrokerError::Closed);
        }

        let state = shared.queues.entry(queue.to_string()).or_default();
        match &state.consumer {
            Some(consumer) => (consumer.handler)(payload),
            None => {
                state.backlog.push_back(payload);
                debug!("no consumer on '{queue}', payload retained as backlog");
            }
        }
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        handler: DeliveryHandler,
    ) -> Result<ConsumerHandle, BrokerError> {
        let mut shared = self.shared.lock().unwrap();
        if shared.closed {
            return Err(BrokerError::Closed);
        }

        let id = shared.next_consumer_id;
        shared.next_consumer_id += 1;

        let state = shared.queues.entry(queue.to_string()).or_default();
        if state.consumer.is_some() {
            return Err(BrokerError::QueueBusy(queue.to_string()));
        }

        // Drain any retained backlog before live deliveries start.
        while let Some(payload) = state.backlog.pop_front() {
            handler(payload);
        }
        state.consumer = Some(Consumer {
            id,
            handler: handler.clone(),
        });

        let shared_ref = Arc::clone(&self.shared);
        let queue_name = queue.to_string();
        Ok(ConsumerHandle::new(queue, move || {
            let mut shared = shared_ref.lock().unwrap();
            if let Some(state) = shared.queues.get_mut(&queue_name) {
                if state.consumer.as_ref().is_some_and(|c| c.id == id) {
                    state.consumer = None;
                }
            }
        }))
    }
}

impl std::fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.shared.lock().unwrap();
        f.debug_struct("MemoryBroker")
            .field("queues", &shared.queues.len())
            .field("closed", &shared.closed)
            .finish()
    }
}
