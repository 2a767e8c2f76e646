use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tungstenite::protocol::Message as WsMessage;

use super::websocket::{Connection, ServiceState};
use crate::broker::{MemoryBroker, QueueBroker};
use crate::persistence::{MessageStore, SledStore};
use crate::pubsub::topics;

fn setup() -> (Arc<MemoryBroker>, Arc<ServiceState>) {
    let broker = Arc::new(MemoryBroker::new());
    let state = ServiceState::build(broker.clone(), 64, None);
    (broker, state)
}

fn connect(state: &Arc<ServiceState>) -> (Connection, mpsc::UnboundedReceiver<WsMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Connection::new(state.clone(), tx), rx)
}

async fn recv_frame(rx: &mut mpsc::UnboundedReceiver<WsMessage>) -> Value {
    let msg = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("connection channel closed");
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

#[tokio::test]
async fn test_identify_subscribes_and_forwards_deliveries() {
    let (broker, state) = setup();
    let (mut conn, mut rx) = connect(&state);

    conn.handle_frame(r#"{"type":"identify","user_id":"alice"}"#)
        .await;
    assert_eq!(conn.user_id(), Some("alice"));

    let snapshot = state.registry.active_subscriptions().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].queues.len(), 5);

    broker
        .publish("user.alice.messages", json!({"content": "hi"}))
        .await
        .unwrap();

    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame["type"], "queue.message");
    assert_eq!(frame["user_id"], "alice");
    assert_eq!(frame["queue"], "user.alice.messages");
    assert_eq!(frame["payload"]["content"], "hi");
}

#[tokio::test]
async fn test_deliveries_for_other_users_are_not_forwarded() {
    let (broker, state) = setup();
    let (mut alice, mut alice_rx) = connect(&state);
    let (mut bob, mut bob_rx) = connect(&state);

    alice
        .handle_frame(r#"{"type":"identify","user_id":"alice"}"#)
        .await;
    bob.handle_frame(r#"{"type":"identify","user_id":"bob"}"#)
        .await;

    broker
        .publish("user.bob.messages", json!({"content": "for bob"}))
        .await
        .unwrap();

    let frame = recv_frame(&mut bob_rx).await;
    assert_eq!(frame["user_id"], "bob");
    assert!(
        timeout(Duration::from_millis(100), alice_rx.recv())
            .await
            .is_err(),
        "alice must not see bob's deliveries"
    );
}

#[tokio::test]
async fn test_join_conversation_requires_identify() {
    let (_broker, state) = setup();
    let (mut conn, _rx) = connect(&state);

    conn.handle_frame(r#"{"type":"join_conversation","conversation_id":"c1"}"#)
        .await;
    assert!(state.registry.active_subscriptions().await.is_empty());
}

#[tokio::test]
async fn test_join_conversation_is_additive() {
    let (_broker, state) = setup();
    let (mut conn, _rx) = connect(&state);

    conn.handle_frame(r#"{"type":"identify","user_id":"alice"}"#)
        .await;
    conn.handle_frame(r#"{"type":"join_conversation","conversation_id":"c1"}"#)
        .await;

    let snapshot = state.registry.active_subscriptions().await;
    assert_eq!(snapshot[0].queues.len(), 6);
    assert!(
        snapshot[0]
            .queues
            .contains(&"conversation.c1.events".to_string())
    );
}

#[tokio::test]
async fn test_send_message_routes_to_receiver_queue() {
    let (broker, state) = setup();
    let (mut conn, _rx) = connect(&state);

    conn.handle_frame(r#"{"type":"identify","user_id":"alice"}"#)
        .await;
    conn.handle_frame(r#"{"type":"send_message","content":"hi","receiver_id":"bob"}"#)
        .await;

    // Bob has no consumer yet, so the event is retained as backlog.
    assert_eq!(broker.backlog_len("user.bob.messages"), 1);
}

#[tokio::test]
async fn test_conversation_message_reaches_joined_member() {
    let (_broker, state) = setup();
    let (mut conn, mut rx) = connect(&state);

    conn.handle_frame(r#"{"type":"identify","user_id":"alice"}"#)
        .await;
    conn.handle_frame(r#"{"type":"join_conversation","conversation_id":"c1"}"#)
        .await;
    conn.handle_frame(r#"{"type":"send_message","content":"hello all","conversation_id":"c1"}"#)
        .await;

    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame["type"], "queue.message");
    assert_eq!(frame["queue"], "conversation.c1.events");
    assert_eq!(frame["payload"]["event"], "message_sent");
    assert_eq!(frame["payload"]["data"]["senderId"], "alice");
    assert_eq!(frame["payload"]["data"]["content"], "hello all");
}

#[tokio::test]
async fn test_stream_forwards_topic_payloads() {
    let (_broker, state) = setup();
    let (mut conn, mut rx) = connect(&state);

    conn.handle_frame(r#"{"type":"stream","topics":["messageReceived"]}"#)
        .await;
    state
        .pubsub
        .publish(topics::MESSAGE_RECEIVED, json!({"userId": "bob"}));

    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame["type"], "event");
    assert_eq!(frame["payload"]["userId"], "bob");
}

#[tokio::test]
async fn test_subscriptions_query_returns_snapshot() {
    let (_broker, state) = setup();
    let (mut conn, mut rx) = connect(&state);

    conn.handle_frame(r#"{"type":"identify","user_id":"alice"}"#)
        .await;
    conn.handle_frame(r#"{"type":"subscriptions"}"#).await;

    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame["type"], "subscriptions");
    assert_eq!(frame["active"][0]["user_id"], "alice");
    assert_eq!(frame["active"][0]["queues"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_invalid_frames_are_ignored() {
    let (_broker, state) = setup();
    let (mut conn, _rx) = connect(&state);

    conn.handle_frame("not json at all").await;
    conn.handle_frame(r#"{"type":"unknown_frame"}"#).await;
    assert!(state.registry.active_subscriptions().await.is_empty());
}

#[tokio::test]
async fn test_close_releases_subscriptions() {
    let (broker, state) = setup();
    let (mut conn, _rx) = connect(&state);

    conn.handle_frame(r#"{"type":"identify","user_id":"alice"}"#)
        .await;
    conn.close().await;

    assert!(state.registry.active_subscriptions().await.is_empty());
    assert!(!broker.has_consumer("user.alice.messages"));
}

#[tokio::test]
async fn test_producer_path_records_to_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SledStore::open(dir.path().to_str().unwrap(), None).unwrap());
    let store_dyn: Arc<dyn MessageStore> = store.clone();
    let broker = Arc::new(MemoryBroker::new());
    let state = ServiceState::build(broker.clone(), 64, Some(store_dyn));
    let (mut conn, _rx) = connect(&state);

    conn.handle_frame(r#"{"type":"publish","queue":"user.bob.messages","payload":{"n":1}}"#)
        .await;

    let stored = store.load("user.bob.messages").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payload, json!({"n": 1}));
    // The broker received it regardless of the store.
    assert_eq!(broker.backlog_len("user.bob.messages"), 1);
}
