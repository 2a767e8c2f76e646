//! WebSocket server and per-connection state.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::QueueBroker;
use crate::delivery::{InboundMessageHandler, NotificationDispatcher};
use crate::events::{BrokerEvent, EventBus, MessagePayload};
use crate::persistence::MessageStore;
use crate::pubsub::PubSub;
use crate::registry::{SubscriptionRegistry, queue};
use crate::transport::message::{ClientMessage, ServerMessage};

/// Shared context handed to every connection.
pub struct ServiceState {
    pub registry: Arc<SubscriptionRegistry>,
    pub broker: Arc<dyn QueueBroker>,
    pub bus: EventBus,
    pub pubsub: PubSub,
    pub store: Option<Arc<dyn MessageStore>>,
}

impl ServiceState {
    /// Wires a complete delivery core on top of `broker` and starts the
    /// inbound message handler.
    pub fn build(
        broker: Arc<dyn QueueBroker>,
        bus_capacity: usize,
        store: Option<Arc<dyn MessageStore>>,
    ) -> Arc<Self> {
        let bus = EventBus::new(bus_capacity);
        let registry = Arc::new(SubscriptionRegistry::new(broker.clone(), bus.clone()));
        let pubsub = PubSub::new();
        let dispatcher = NotificationDispatcher::new(pubsub.clone());
        InboundMessageHandler::new(dispatcher, pubsub.clone()).spawn(bus.subscribe());

        Arc::new(Self {
            registry,
            broker,
            bus,
            pubsub,
            store,
        })
    }
}

/// Accepts WebSocket clients and runs one connection task each.
pub async fn start_websocket_server(addr: &str, state: Arc<ServiceState>) {
    let listener = TcpListener::bind(addr).await.expect("Can't bind");

    info!("WebSocket server listening on ws://{addr}");

    while let Ok((stream, _)) = listener.accept().await {
        let state = state.clone();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake error: {e}");
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();

            // Channel carrying outbound frames for this client
            let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

            let mut conn = Connection::new(state, tx);
            let conn_id = conn.id().to_string();

            // Forward outbound frames to the socket
            tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    if let Err(e) = ws_sender.send(msg).await {
                        debug!("failed to send to {conn_id}: {e}");
                        break;
                    }
                }
            });

            // Handle incoming frames from the client
            while let Some(Ok(msg)) = ws_receiver.next().await {
                if msg.is_text() {
                    let text = msg.to_text().unwrap();
                    conn.handle_frame(text).await;
                }
            }

            conn.close().await;
        });
    }
}

/// One client connection: protocol dispatch plus the forwarding tasks it
/// owns.
pub struct Connection {
    id: String,
    state: Arc<ServiceState>,
    tx: mpsc::UnboundedSender<WsMessage>,
    user_id: Option<String>,
    forward_task: Option<JoinHandle<()>>,
    stream_tasks: Vec<JoinHandle<()>>,
}

impl Connection {
    pub fn new(state: Arc<ServiceState>, tx: mpsc::UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("conn-{}", Uuid::new_v4()),
            state,
            tx,
            user_id: None,
            forward_task: None,
            stream_tasks: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub async fn handle_frame(&mut self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Identify { user_id }) => self.identify(user_id).await,
            Ok(ClientMessage::JoinConversation { conversation_id }) => {
                self.join_conversation(&conversation_id).await;
            }
            Ok(ClientMessage::Publish { queue, payload }) => {
                self.produce(&queue, payload).await;
            }
            Ok(ClientMessage::SendMessage {
                content,
                receiver_id,
                conversation_id,
            }) => {
                self.send_message(content, receiver_id, conversation_id)
                    .await;
            }
            Ok(ClientMessage::Stream { topics }) => self.stream(topics),
            Ok(ClientMessage::Subscriptions) => self.report_subscriptions().await,
            Err(err) => {
                warn!("invalid client message on {}: {err} | {text}", self.id);
            }
        }
    }

    /// Binds the connection to `user_id`: subscribes the personal queues and
    /// starts forwarding that user's bus deliveries down the socket.
    async fn identify(&mut self, user_id: String) {
        if self.user_id.is_some() {
            warn!("{} is already identified, ignoring identify", self.id);
            return;
        }

        match self.state.registry.subscribe_user_to_queues(&user_id).await {
            Ok(queues) => {
                info!(
                    "{} identified as '{user_id}' ({} queues)",
                    self.id,
                    queues.len()
                );
            }
            Err(err) => {
                warn!("{} identify failed: {err}", self.id);
                return;
            }
        }

        let mut rx = self.state.bus.subscribe();
        let tx = self.tx.clone();
        let uid = user_id.clone();
        self.forward_task = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(delivery) => {
                        if delivery.user_id != uid {
                            continue;
                        }
                        match serde_json::to_string(&ServerMessage::QueueMessage { delivery }) {
                            Ok(json) => {
                                if tx.send(WsMessage::text(json)).is_err() {
                                    break;
                                }
                            }
                            Err(err) => warn!("failed to encode queue message: {err}"),
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("connection of '{uid}' lagged, skipped {n} deliveries");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
        self.user_id = Some(user_id);
    }

    async fn join_conversation(&mut self, conversation_id: &str) {
        let Some(user_id) = self.user_id.clone() else {
            warn!("{} tried to join a conversation before identify", self.id);
            return;
        };
        if let Err(err) = self
            .state
            .registry
            .subscribe_to_conversation_queue(&user_id, conversation_id)
            .await
        {
            warn!("{} join_conversation failed: {err}", self.id);
        }
    }

    /// Producer path: record the payload when a store is configured, then
    /// hand it to the broker. Delivery does not depend on store success.
    async fn produce(&self, queue: &str, payload: serde_json::Value) {
        if let Some(store) = &self.state.store {
            if let Err(err) = store.store(queue, &payload) {
                warn!("message store failed for '{queue}': {err}");
            }
        }
        if let Err(err) = self.state.broker.publish(queue, payload).await {
            warn!("broker publish to '{queue}' failed: {err}");
        }
    }

    /// Wraps the fields into a `message_sent` event and routes it: the
    /// receiver's messages queue when addressed directly, the conversation
    /// events queue otherwise.
    async fn send_message(
        &mut self,
        content: String,
        receiver_id: Option<String>,
        conversation_id: Option<String>,
    ) {
        let event = BrokerEvent::message_sent(MessagePayload {
            content: Some(content),
            sender_id: self.user_id.clone(),
            receiver_id: receiver_id.clone(),
            conversation_id: conversation_id.clone(),
            extra: serde_json::Map::new(),
        });
        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("failed to encode message_sent event: {err}");
                return;
            }
        };

        if let Some(receiver) = &receiver_id {
            self.produce(&queue::user_queue(receiver, queue::MESSAGES), payload)
                .await;
        } else if let Some(conversation) = &conversation_id {
            self.produce(&queue::conversation_queue(conversation), payload)
                .await;
        } else {
            debug!("{} send_message with no destination, dropped", self.id);
        }
    }

    /// Attaches a pub/sub subscription and streams its payloads down the
    /// socket until the subscription or the socket goes away.
    fn stream(&mut self, topics: Vec<String>) {
        let refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        let mut subscription = self.state.pubsub.subscribe(&refs);
        let tx = self.tx.clone();
        self.stream_tasks.push(tokio::spawn(async move {
            while let Some(payload) = subscription.recv().await {
                match serde_json::to_string(&ServerMessage::Event { payload }) {
                    Ok(json) => {
                        if tx.send(WsMessage::text(json)).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!("failed to encode event frame: {err}"),
                }
            }
        }));
    }

    async fn report_subscriptions(&self) {
        let active = self.state.registry.active_subscriptions().await;
        self.send_frame(&ServerMessage::Subscriptions { active });
    }

    fn send_frame(&self, frame: &ServerMessage) {
        match serde_json::to_string(frame) {
            Ok(json) => {
                let _ = self.tx.send(WsMessage::text(json));
            }
            Err(err) => warn!("failed to encode server frame: {err}"),
        }
    }

    /// Tears the connection down: stops forwarding tasks and releases the
    /// identified user's broker subscriptions.
    pub async fn close(&mut self) {
        if let Some(task) = self.forward_task.take() {
            task.abort();
        }
        for task in self.stream_tasks.drain(..) {
            task.abort();
        }
        if let Some(user_id) = self.user_id.take() {
            self.state.registry.unsubscribe_user(&user_id).await;
        }
        info!("{} disconnected", self.id);
    }
}
