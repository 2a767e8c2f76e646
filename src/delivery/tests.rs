use serde_json::json;

use super::dispatcher::NotificationDispatcher;
use super::handler::InboundMessageHandler;
use crate::events::{EventBus, QueueDelivery};
use crate::pubsub::{PubSub, topics};

fn setup() -> (PubSub, InboundMessageHandler) {
    let pubsub = PubSub::new();
    let dispatcher = NotificationDispatcher::new(pubsub.clone());
    let handler = InboundMessageHandler::new(dispatcher, pubsub.clone());
    (pubsub, handler)
}

fn message_sent(receiver: Option<&str>, conversation: Option<&str>) -> QueueDelivery {
    let mut data = json!({ "content": "hi", "senderId": "A" });
    if let Some(receiver) = receiver {
        data["receiverId"] = json!(receiver);
    }
    if let Some(conversation) = conversation {
        data["conversationId"] = json!(conversation);
    }
    QueueDelivery::now(
        receiver.unwrap_or("-"),
        "user.B.messages",
        json!({ "event": "message_sent", "data": data }),
    )
}

#[tokio::test]
async fn test_fanout_hits_both_sinks_exactly_once() {
    let (pubsub, handler) = setup();
    let mut global = pubsub.subscribe(&[topics::MESSAGE_RECEIVED]);
    let mut scoped = pubsub.subscribe(&[topics::MESSAGE_RECEIVED_IN_CONVERSATION]);

    handler.handle(&message_sent(Some("B"), Some("C1")));

    let notified = global.recv().await.unwrap();
    assert_eq!(notified["userId"], "B");
    assert_eq!(notified["message"]["content"], "hi");
    assert_eq!(notified["message"]["senderId"], "A");

    let broadcast = scoped.recv().await.unwrap();
    assert_eq!(broadcast["conversationId"], "C1");
    assert_eq!(broadcast["content"], "hi");

    // Exactly once per sink.
    assert!(futures::poll!(Box::pin(global.recv())).is_pending());
    assert!(futures::poll!(Box::pin(scoped.recv())).is_pending());
}

#[tokio::test]
async fn test_missing_receiver_skips_user_notification() {
    let (pubsub, handler) = setup();
    let mut global = pubsub.subscribe(&[topics::MESSAGE_RECEIVED]);
    let mut scoped = pubsub.subscribe(&[topics::MESSAGE_RECEIVED_IN_CONVERSATION]);

    handler.handle(&message_sent(None, Some("C1")));

    assert_eq!(scoped.recv().await.unwrap()["conversationId"], "C1");
    assert!(futures::poll!(Box::pin(global.recv())).is_pending());
}

#[tokio::test]
async fn test_missing_conversation_skips_topic_broadcast() {
    let (pubsub, handler) = setup();
    let mut global = pubsub.subscribe(&[topics::MESSAGE_RECEIVED]);
    let mut scoped = pubsub.subscribe(&[topics::MESSAGE_RECEIVED_IN_CONVERSATION]);

    handler.handle(&message_sent(Some("B"), None));

    assert_eq!(global.recv().await.unwrap()["userId"], "B");
    assert!(futures::poll!(Box::pin(scoped.recv())).is_pending());
}

#[tokio::test]
async fn test_non_message_events_are_ignored() {
    let (pubsub, handler) = setup();
    let mut global = pubsub.subscribe(&[topics::MESSAGE_RECEIVED]);

    handler.handle(&QueueDelivery::now(
        "u1",
        "user.u1.status",
        json!({ "event": "status_changed", "data": { "receiverId": "B" } }),
    ));
    // Payloads that are not events at all degrade silently too.
    handler.handle(&QueueDelivery::now("u1", "user.u1.status", json!("online")));

    assert!(futures::poll!(Box::pin(global.recv())).is_pending());
}

#[tokio::test]
async fn test_run_consumes_from_the_bus() {
    let (pubsub, handler) = setup();
    let bus = EventBus::new(16);
    let mut global = pubsub.subscribe(&[topics::MESSAGE_RECEIVED]);

    let task = handler.spawn(bus.subscribe());
    bus.publish(message_sent(Some("B"), Some("C1")));

    let notified = global.recv().await.unwrap();
    assert_eq!(notified["userId"], "B");
    task.abort();
}

#[tokio::test]
async fn test_dispatcher_drops_without_listener() {
    let pubsub = PubSub::new();
    let dispatcher = NotificationDispatcher::new(pubsub.clone());
    // No listener attached: publishing must not error.
    dispatcher.send_to_user("B", &json!({"content": "hi"}));
    assert_eq!(pubsub.listener_count(topics::MESSAGE_RECEIVED), 0);
}
