//! Request and response types for the chat service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of the message author that seeds every chat.
pub const ROLE_SYSTEM: &str = "system";
/// Role of messages the user sends.
pub const ROLE_USER: &str = "user";
/// Role of replies.
pub const ROLE_ASSISTANT: &str = "assistant";

// ─────────────────────────────────────────────────────────────────────────────
// Chats
// ─────────────────────────────────────────────────────────────────────────────

/// A chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Body of `POST /chats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl CreateChatRequest {
    /// Tag the chat with the tool it was started for.
    pub fn with_tool(tool: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("mcp_tool".to_string(), Value::String(tool.into()));
        Self {
            metadata: Some(metadata),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// One message in a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ChatMessage {
    /// A message with just a role and content.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            chat_id: None,
            role: role.into(),
            content: content.into(),
            created_at: None,
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ROLE_USER, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ROLE_ASSISTANT, content)
    }

    /// Whether this is the system seed message.
    pub fn is_system(&self) -> bool {
        self.role == ROLE_SYSTEM
    }
}

/// Response of `GET /chats/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub chat_id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatHistory {
    /// Messages without the system seed.
    pub fn visible(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| !m.is_system())
    }
}

/// Body of `POST /chats/{id}/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Response of `POST /chats/{id}/messages`: the stored message and the reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub message: ChatMessage,
    pub response: ChatMessage,
}
