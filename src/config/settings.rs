use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub delivery: DeliverySettings,
}

/// Host and port the WebSocket server binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Operational parameters of the delivery core.
#[derive(Debug, Deserialize, Clone)]
pub struct DeliverySettings {
    /// Capacity of the internal event bus ring buffer.
    pub bus_capacity: usize,
    /// When true, the producer path records payloads in the message store.
    pub persist_messages: bool,
    /// Filesystem path of the embedded message store.
    pub store_path: String,
    /// Time-to-live applied to stored messages.
    pub message_ttl_secs: u64,
}

/// Partial configuration loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled
/// using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub delivery: Option<PartialDeliverySettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialDeliverySettings {
    pub bus_capacity: Option<usize>,
    pub persist_messages: Option<bool>,
    pub store_path: Option<String>,
    pub message_ttl_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            delivery: DeliverySettings {
                bus_capacity: 1024,
                persist_messages: false,
                store_path: "courier_db".to_string(),
                message_ttl_secs: 3600,
            },
        }
    }
}
