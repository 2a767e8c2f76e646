use std::sync::Arc;

use tracing::{error, info, warn};

use courier::broker::MemoryBroker;
use courier::config::load_config;
use courier::persistence::{MessageStore, SledStore};
use courier::transport::{ServiceState, start_websocket_server};
use courier::utils::logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init("info");

    let settings = load_config().expect("Failed to load configuration");
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let store: Option<Arc<dyn MessageStore>> = if settings.delivery.persist_messages {
        match SledStore::open(
            &settings.delivery.store_path,
            Some(settings.delivery.message_ttl_secs as i64),
        ) {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                warn!("message store unavailable, continuing without: {err}");
                None
            }
        }
    } else {
        None
    };

    let broker = Arc::new(MemoryBroker::new());
    let state = ServiceState::build(broker, settings.delivery.bus_capacity, store);

    tokio::select! {
        _ = start_websocket_server(&addr, state) => {
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }
}
