//! Broker queue naming scheme.
//!
//! Personal queues are `user.<user_id>.<kind>`; conversation queues are
//! `conversation.<conversation_id>.events`. This module is the single source
//! of truth for queue names.

/// Queue kinds every connected user is subscribed to.
pub const PERSONAL_QUEUE_KINDS: [&str; 5] =
    ["messages", "status", "typing", "friends", "conversations"];

/// Kind of the queue direct messages are produced into.
pub const MESSAGES: &str = "messages";

/// Name of one personal queue.
pub fn user_queue(user_id: &str, kind: &str) -> String {
    format!("user.{user_id}.{kind}")
}

/// The full set of personal queue names for a user, in subscription order.
pub fn personal_queues(user_id: &str) -> Vec<String> {
    PERSONAL_QUEUE_KINDS
        .iter()
        .map(|kind| user_queue(user_id, kind))
        .collect()
}

/// Name of a conversation-scoped queue.
pub fn conversation_queue(conversation_id: &str) -> String {
    format!("conversation.{conversation_id}.events")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_queue_names() {
        let queues = personal_queues("u1");
        assert_eq!(queues.len(), 5);
        assert_eq!(queues[0], "user.u1.messages");
        assert!(queues.contains(&"user.u1.typing".to_string()));
        assert!(queues.contains(&"user.u1.friends".to_string()));
    }

    #[test]
    fn test_conversation_queue_name() {
        assert_eq!(conversation_queue("c1"), "conversation.c1.events");
    }
}
