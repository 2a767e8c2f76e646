//! Error types shared across the delivery core.
//!
//! Subscribe operations return explicit error kinds so callers and tests can
//! observe a failed broker attach instead of inferring it from the absence of
//! a subscription.

use thiserror::Error;

/// Failures raised by a queue broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The queue already has an active consumer attached.
    #[error("queue '{0}' already has an active consumer")]
    QueueBusy(String),

    /// The broker has been closed and accepts no further operations.
    #[error("broker is closed")]
    Closed,
}

/// Failure to subscribe a user to a broker queue.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("failed to subscribe user '{user_id}' to queue '{queue}': {source}")]
    Broker {
        user_id: String,
        queue: String,
        #[source]
        source: BrokerError,
    },
}

impl SubscribeError {
    /// The queue name the failed subscribe was targeting.
    pub fn queue(&self) -> &str {
        match self {
            SubscribeError::Broker { queue, .. } => queue,
        }
    }
}

/// Failures raised by the message store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open message store at '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: sled::Error,
    },

    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),

    #[error("failed to encode stored message: {0}")]
    Encode(#[from] serde_json::Error),
}
