//! Conversation history
//!
//! An ordered message sequence for one logical thread of interaction.

use serde::{Deserialize, Serialize};

use crate::core::{Message, Role};

/// Ordered message history for one thread
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation from existing messages
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a user message
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Prefix a system message when the history does not start with one
    pub fn ensure_system(&mut self, prompt: &str) {
        let has_system = self
            .messages
            .first()
            .map(|message| message.role == Role::System)
            .unwrap_or(false);
        if !has_system {
            self.messages.insert(0, Message::system(prompt));
        }
    }

    /// All messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Consume into the message sequence
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// The most recent assistant message
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
    }

    /// The most recent tool-result message
    pub fn last_tool_result(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Tool)
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_system_prefixes_once() {
        let mut conversation = Conversation::new();
        conversation.push_user("what tables exist?");
        conversation.ensure_system("be a data analyst");

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].role, Role::System);

        // A second call leaves the history unchanged
        conversation.ensure_system("be a data analyst");
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_last_accessors() {
        let mut conversation = Conversation::new();
        conversation.push_user("hi");
        conversation.push(Message::assistant("checking"));
        conversation.push(Message::tool_result("call_1", "[]"));
        conversation.push(Message::assistant("done"));

        assert_eq!(conversation.last_assistant().unwrap().content, "done");
        assert_eq!(conversation.last_tool_result().unwrap().content, "[]");
    }
}
