use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a canonical, provider-independent chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A chat message as exchanged with the UI: role plus plain text.
///
/// This is the only conversation state retained across turns; each
/// provider rebuilds its own wire representation from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Vendor-shaped conversation for one loop run.
///
/// Holds messages already encoded by a provider adapter. Append-only: hops
/// add the assistant's tool request and the tool result, nothing is removed.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Value>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Value>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Value) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_wire_shape() {
        let msg = ChatMessage::user("pick a number under 10");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "pick a number under 10");

        let parsed: ChatMessage =
            serde_json::from_value(serde_json::json!({"role": "assistant", "content": "7"})).unwrap();
        assert_eq!(parsed, ChatMessage::assistant("7"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let parsed = serde_json::from_value::<ChatMessage>(
            serde_json::json!({"role": "system", "content": "x"}),
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_conversation_is_append_only() {
        let mut conv = Conversation::new();
        assert!(conv.is_empty());
        conv.push(serde_json::json!({"role": "user", "content": "a"}));
        conv.push(serde_json::json!({"role": "assistant", "content": "b"}));
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages()[0]["content"], "a");
    }
}
