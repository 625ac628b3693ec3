//! Chat history service.

use async_trait::async_trait;

use crate::client::ChatClient;
use crate::error::{Error, Result};
use crate::types::{
    ChatExchange, ChatHistory, ChatMessage, ChatSession, CreateChatRequest, SendMessageRequest,
};

/// Stores chats and answers messages when no tool handles them.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Start a chat.
    async fn create_chat(&self, request: CreateChatRequest) -> Result<ChatSession>;

    /// Fetch a chat's metadata.
    async fn get_chat(&self, chat_id: &str) -> Result<ChatSession>;

    /// Every message of a chat, oldest first.
    async fn get_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>>;

    /// Store a user message and get the service's reply.
    async fn send_message(&self, chat_id: &str, content: &str) -> Result<ChatExchange>;

    /// Delete a chat and its messages.
    async fn delete_chat(&self, chat_id: &str) -> Result<()>;
}

/// Path of one chat; the id is escaped so it stays a single segment.
fn chat_path(chat_id: &str) -> Result<String> {
    // URL resolution collapses dot segments even when percent-encoded.
    if matches!(chat_id, "" | "." | "..") {
        return Err(Error::InvalidChatId(chat_id.to_string()));
    }
    Ok(format!("chats/{}", urlencoding::encode(chat_id)))
}

#[async_trait]
impl ChatService for ChatClient {
    async fn create_chat(&self, request: CreateChatRequest) -> Result<ChatSession> {
        let chat: ChatSession = self.post("chats", &request).await?;
        tracing::debug!(chat_id = %chat.id, "created chat");
        Ok(chat)
    }

    async fn get_chat(&self, chat_id: &str) -> Result<ChatSession> {
        self.get(&chat_path(chat_id)?).await
    }

    async fn get_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        let history: ChatHistory = self
            .get(&format!("{}/messages", chat_path(chat_id)?))
            .await?;
        Ok(history.messages)
    }

    async fn send_message(&self, chat_id: &str, content: &str) -> Result<ChatExchange> {
        let request = SendMessageRequest {
            content: content.to_string(),
            metadata: None,
        };
        self.post(&format!("{}/messages", chat_path(chat_id)?), &request)
            .await
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        self.delete(&chat_path(chat_id)?).await?;
        tracing::debug!(chat_id, "deleted chat");
        Ok(())
    }
}
