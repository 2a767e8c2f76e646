use serde_json::json;

use super::bus::EventBus;
use super::message::{BrokerEvent, MessagePayload, QueueDelivery};

#[tokio::test]
async fn test_bus_roundtrip() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();

    bus.publish(QueueDelivery::now("u1", "user.u1.messages", json!({"x": 1})));

    let delivery = rx.recv().await.unwrap();
    assert_eq!(delivery.user_id, "u1");
    assert_eq!(delivery.queue, "user.u1.messages");
    assert_eq!(delivery.payload, json!({"x": 1}));
    assert!(delivery.received_at > 0);
}

#[test]
fn test_bus_publish_without_receivers() {
    let bus = EventBus::new(4);
    // No receiver attached: the delivery is dropped without error.
    bus.publish(QueueDelivery::now("u1", "user.u1.status", json!("online")));
    assert_eq!(bus.receiver_count(), 0);
}

#[tokio::test]
async fn test_bus_no_replay_for_late_receivers() {
    let bus = EventBus::new(16);
    let mut early = bus.subscribe();

    bus.publish(QueueDelivery::now("u1", "q", json!(1)));
    let mut late = bus.subscribe();
    bus.publish(QueueDelivery::now("u1", "q", json!(2)));

    assert_eq!(early.recv().await.unwrap().payload, json!(1));
    assert_eq!(early.recv().await.unwrap().payload, json!(2));
    // The late receiver only sees the second delivery.
    assert_eq!(late.recv().await.unwrap().payload, json!(2));
    assert!(late.try_recv().is_err());
}

#[test]
fn test_message_sent_full_payload() {
    let raw = json!({
        "event": "message_sent",
        "data": {
            "content": "hi",
            "senderId": "A",
            "receiverId": "B",
            "conversationId": "C1",
            "sentAt": 1_725_000_000
        }
    });

    let event: BrokerEvent = serde_json::from_value(raw).unwrap();
    assert!(event.is_message_sent());
    assert_eq!(event.data.content.as_deref(), Some("hi"));
    assert_eq!(event.data.sender_id.as_deref(), Some("A"));
    assert_eq!(event.data.receiver_id.as_deref(), Some("B"));
    assert_eq!(event.data.conversation_id.as_deref(), Some("C1"));
    // Unknown fields are preserved, not rejected.
    assert_eq!(event.data.extra.get("sentAt"), Some(&json!(1_725_000_000)));
}

#[test]
fn test_message_sent_missing_fields_degrade_to_none() {
    let raw = json!({ "event": "message_sent", "data": { "content": "hi" } });
    let event: BrokerEvent = serde_json::from_value(raw).unwrap();
    assert!(event.data.sender_id.is_none());
    assert!(event.data.receiver_id.is_none());
    assert!(event.data.conversation_id.is_none());

    // Even an absent body parses; the payload is simply empty.
    let bare: BrokerEvent = serde_json::from_value(json!({ "event": "message_sent" })).unwrap();
    assert!(bare.data.content.is_none());
}

#[test]
fn test_message_payload_serializes_camel_case() {
    let event = BrokerEvent::message_sent(MessagePayload {
        content: Some("hello".into()),
        sender_id: Some("A".into()),
        receiver_id: Some("B".into()),
        conversation_id: None,
        extra: serde_json::Map::new(),
    });

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event"], "message_sent");
    assert_eq!(value["data"]["senderId"], "A");
    assert_eq!(value["data"]["receiverId"], "B");
    // Absent optionals are omitted from the wire shape entirely.
    assert!(value["data"].get("conversationId").is_none());
}
