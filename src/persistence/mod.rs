//! The `persistence` module is the message-store collaborator contract.
//!
//! The fan-out core itself never persists: storage is an external
//! collaborator reached through the [`MessageStore`] trait, wired in by the
//! service when enabled. [`SledStore`] is the embedded implementation,
//! keeping recent payloads per queue for replay and inspection.

pub mod store;

pub use store::{MessageStore, SledStore, StoredMessage};
