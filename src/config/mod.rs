//! Layered configuration loading.
//!
//! Settings come from `config/default` (optional file) and environment
//! variables, merged field by field over [`Settings::default`].

mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{DeliverySettings, ServerSettings, Settings};

/// Loads the configuration from the default file and environment variables
/// and merges it with default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        delivery: DeliverySettings {
            bus_capacity: partial
                .delivery
                .as_ref()
                .and_then(|d| d.bus_capacity)
                .unwrap_or(default.delivery.bus_capacity),
            persist_messages: partial
                .delivery
                .as_ref()
                .and_then(|d| d.persist_messages)
                .unwrap_or(default.delivery.persist_messages),
            store_path: partial
                .delivery
                .as_ref()
                .and_then(|d| d.store_path.clone())
                .unwrap_or(default.delivery.store_path),
            message_ttl_secs: partial
                .delivery
                .as_ref()
                .and_then(|d| d.message_ttl_secs)
                .unwrap_or(default.delivery.message_ttl_secs),
        },
    })
}
