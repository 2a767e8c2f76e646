//! Sled-backed message store.
//!
//! Messages are stored per-queue in a `sled` tree. Each key is the receipt
//! timestamp in big-endian milliseconds so iteration yields messages in
//! chronological order and TTL cleanup can scan from the front.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sled::Db;

use crate::utils::error::StoreError;

/// External collaborator contract for message storage.
///
/// Delivery never depends on a store call succeeding; callers log failures
/// and proceed.
pub trait MessageStore: Send + Sync {
    /// Records a payload published to `queue`.
    fn store(&self, queue: &str, payload: &Value) -> Result<(), StoreError>;

    /// Loads the retained messages for `queue` in chronological order.
    fn load(&self, queue: &str) -> Result<Vec<StoredMessage>, StoreError>;
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StoredMessage {
    pub queue: String,
    pub payload: Value,
    pub timestamp: i64,
}

/// Embedded [`MessageStore`] implementation.
///
/// `ttl_seconds`, when set, drops messages older than the TTL during load.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    ttl_seconds: Option<i64>,
}

impl SledStore {
    /// Opens or creates the store at `path`.
    pub fn open(path: &str, ttl_seconds: Option<i64>) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|source| StoreError::Open {
            path: path.to_string(),
            source,
        })?;
        Ok(Self { db, ttl_seconds })
    }

    fn store_at(&self, queue: &str, payload: &Value, timestamp: i64) -> Result<(), StoreError> {
        let msg = StoredMessage {
            queue: queue.to_string(),
            payload: payload.clone(),
            timestamp,
        };
        let serialized = serde_json::to_vec(&msg)?;
        let tree = self.db.open_tree(queue)?;
        tree.insert(timestamp.to_be_bytes(), serialized)?;
        Ok(())
    }

    fn cleanup_expired(&self, queue: &str) -> Result<(), StoreError> {
        let Some(ttl) = self.ttl_seconds else {
            return Ok(());
        };
        let expiry = Utc::now().timestamp_millis() - ttl * 1000;

        let tree = self.db.open_tree(queue)?;
        let expired: Vec<_> = tree
            .iter()
            .filter_map(|res| res.ok())
            .map(|(key, _)| key)
            .filter(|key| {
                key.len() == 8 && i64::from_be_bytes(key[..].try_into().unwrap()) < expiry
            })
            .collect();
        for key in expired {
            tree.remove(key)?;
        }
        Ok(())
    }
}

impl MessageStore for SledStore {
    fn store(&self, queue: &str, payload: &Value) -> Result<(), StoreError> {
        self.store_at(queue, payload, Utc::now().timestamp_millis())
    }

    fn load(&self, queue: &str) -> Result<Vec<StoredMessage>, StoreError> {
        self.cleanup_expired(queue)?;
        let tree = self.db.open_tree(queue)?;
        Ok(tree
            .iter()
            .filter_map(|res| res.ok())
            .filter_map(|(_, val)| serde_json::from_slice(&val).ok())
            .collect())
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

#[cfg(test)]
impl SledStore {
    /// Test hook: store with an explicit timestamp so TTL expiry can be
    /// exercised without sleeping.
    pub(crate) fn store_with_timestamp(
        &self,
        queue: &str,
        payload: &Value,
        timestamp: i64,
    ) -> Result<(), StoreError> {
        self.store_at(queue, payload, timestamp)
    }
}
