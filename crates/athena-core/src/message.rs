//! Conversation messages and chat requests.

use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Returns the speaker prefix used in transcripts.
    pub fn speaker(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat turn: the new user input plus the caller-held history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_input: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Creates a request without history.
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            history: Vec::new(),
        }
    }

    /// Sets the conversation history.
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Returns true if the input is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.user_input.trim().is_empty()
    }
}

/// Renders history as `User:` / `Assistant:` lines, one per message.
pub fn render_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}\n", m.role.speaker(), m.content.trim()))
        .collect()
}
