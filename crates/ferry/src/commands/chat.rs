//! Chat command - interactive REPL mode.
//!
//! A turn goes to the selected tool when the tool host is connected, and to
//! the chat service otherwise.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;
use serde_json::{Value, json};

use ferry_agent::ToolExecutor;
use ferry_client::{ChatMessage, ChatService, CreateChatRequest, ROLE_ASSISTANT};
use ferry_mcp::{ConnectionState, ExecutionResult, McpClient, default_tool};

use super::Context;
use super::output::print_dim;
use super::repl::Repl;

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Resume an existing chat
    #[arg(short, long)]
    pub chat: Option<String>,

    /// Route turns through this tool instead of the first listed one
    #[arg(short, long)]
    pub tool: Option<String>,

    /// Talk to the chat service only, never to the tool host
    #[arg(long)]
    pub no_tools: bool,
}

/// Run the chat command (REPL).
pub async fn run(args: ChatArgs, ctx: &Context) -> Result<()> {
    let client = Arc::new(McpClient::new(ctx.server_config())?);
    let service: Arc<dyn ChatService> = Arc::new(ctx.chat_client()?);

    let mut tool = None;
    if !args.no_tools {
        match client.list_tools().await {
            Ok(tools) => {
                tool = match args.tool {
                    Some(name) if tools.iter().any(|t| t.name == name) => Some(name),
                    Some(name) => bail!("Unknown tool '{}'. Run 'ferry tools' to list them.", name),
                    None => default_tool(&tools).map(|t| t.name.clone()),
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, "tool host unavailable, using chat service");
                print_dim(&format!("Tool host unavailable ({}); using the chat service.", e));
            }
        }
    }

    let mut conversation = Conversation::new(client.clone(), service).with_tool(tool);
    if let Some(chat_id) = args.chat {
        conversation.resume(&chat_id).await?;
    }

    let mut repl = Repl::new(conversation, client.clone(), ctx.verbose)?;
    let outcome = repl.run().await;
    client.disconnect();
    outcome
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────────────────────────────────────

/// The answer to one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The selected tool answered.
    Tool {
        tool: String,
        result: ExecutionResult,
    },
    /// The chat service answered.
    Chat(ChatMessage),
}

impl Reply {
    /// Text shown to the user and kept in the transcript.
    pub fn text(&self) -> String {
        match self {
            Self::Tool { result, .. } => {
                let text = result.text();
                if text.is_empty() {
                    "No response from tool".to_string()
                } else {
                    text
                }
            }
            Self::Chat(message) => message.content.clone(),
        }
    }
}

/// Routes chat turns and keeps the visible transcript.
pub struct Conversation {
    executor: Arc<dyn ToolExecutor>,
    service: Arc<dyn ChatService>,
    chat_id: Option<String>,
    tool: Option<String>,
    transcript: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(executor: Arc<dyn ToolExecutor>, service: Arc<dyn ChatService>) -> Self {
        Self {
            executor,
            service,
            chat_id: None,
            tool: None,
            transcript: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: Option<String>) -> Self {
        self.tool = tool;
        self
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn tool(&self) -> Option<&str> {
        self.tool.as_deref()
    }

    pub fn select_tool(&mut self, tool: Option<String>) {
        self.tool = tool;
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Whether the executor's session is up.
    pub fn is_connected(&self) -> bool {
        self.executor
            .watch_state()
            .is_some_and(|state| *state.borrow() == ConnectionState::Connected)
    }

    /// Whether the next turn would go to the tool.
    pub fn routes_to_tool(&self) -> bool {
        self.tool.is_some() && self.is_connected()
    }

    /// Load a stored chat, hiding system messages.
    pub async fn resume(&mut self, chat_id: &str) -> Result<()> {
        let messages = self.service.get_messages(chat_id).await?;
        self.transcript = messages.into_iter().filter(|m| !m.is_system()).collect();
        self.chat_id = Some(chat_id.to_string());
        Ok(())
    }

    /// Forget the transcript; the next service turn starts a new chat.
    pub fn reset(&mut self) {
        self.chat_id = None;
        self.transcript.clear();
    }

    /// Send one user turn.
    pub async fn send(&mut self, content: &str) -> Result<Reply> {
        let content = content.trim();
        if content.is_empty() {
            bail!("Message cannot be empty");
        }

        let history = self.history_payload();

        let reply = match self.tool.clone().filter(|_| self.is_connected()) {
            Some(tool) => {
                let arguments = json!({ "query": content, "chat_history": history });
                tracing::debug!(tool = %tool, "routing turn to tool");
                let result = self.executor.execute_tool(&tool, arguments).await?;
                Reply::Tool { tool, result }
            }
            None => {
                let chat_id = self.ensure_chat().await?;
                tracing::debug!(chat_id = %chat_id, "routing turn to chat service");
                let exchange = self.service.send_message(&chat_id, content).await?;
                Reply::Chat(exchange.response)
            }
        };

        // Only completed turns enter the transcript.
        self.transcript.push(ChatMessage::user(content));
        self.transcript
            .push(ChatMessage::new(ROLE_ASSISTANT, reply.text()));
        Ok(reply)
    }

    async fn ensure_chat(&mut self) -> Result<String> {
        if let Some(id) = &self.chat_id {
            return Ok(id.clone());
        }
        let request = match &self.tool {
            Some(tool) => CreateChatRequest::with_tool(tool.clone()),
            None => CreateChatRequest::default(),
        };
        let chat = self.service.create_chat(request).await?;
        self.chat_id = Some(chat.id.clone());
        Ok(chat.id)
    }

    /// Earlier turns as `{role, content}` pairs.
    fn history_payload(&self) -> Value {
        Value::Array(
            self.transcript
                .iter()
                .map(|m| json!({ "role": m.role, "content": m.content }))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferry_client::{ChatExchange, ChatSession};
    use parking_lot::Mutex;
    use tokio::sync::watch;

    struct Recorder<T>(Mutex<Vec<T>>);

    impl<T> Default for Recorder<T> {
        fn default() -> Self {
            Self(Mutex::new(Vec::new()))
        }
    }

    impl<T: Clone> Recorder<T> {
        fn push(&self, item: T) {
            self.0.lock().push(item);
        }

        fn all(&self) -> Vec<T> {
            self.0.lock().clone()
        }
    }

    struct FakeExecutor {
        state: watch::Sender<ConnectionState>,
        calls: Recorder<(String, Value)>,
        failing: Mutex<bool>,
    }

    impl FakeExecutor {
        fn new(state: ConnectionState) -> Arc<Self> {
            Arc::new(Self {
                state: watch::Sender::new(state),
                calls: Recorder::default(),
                failing: Mutex::new(false),
            })
        }

        fn set_failing(&self, failing: bool) {
            *self.failing.lock() = failing;
        }
    }

    #[async_trait]
    impl ToolExecutor for FakeExecutor {
        async fn execute_tool(
            &self,
            name: &str,
            arguments: Value,
        ) -> ferry_mcp::Result<ExecutionResult> {
            self.calls.push((name.to_string(), arguments));
            if *self.failing.lock() {
                return Err(ferry_mcp::McpError::ConnectionLost);
            }
            Ok(ExecutionResult::text_only(format!("tool says hi #{}", self.calls.all().len())))
        }

        fn watch_state(&self) -> Option<watch::Receiver<ConnectionState>> {
            Some(self.state.subscribe())
        }
    }

    #[derive(Default)]
    struct FakeService {
        created: Recorder<CreateChatRequest>,
        sent: Recorder<(String, String)>,
    }

    #[async_trait]
    impl ChatService for FakeService {
        async fn create_chat(&self, request: CreateChatRequest) -> ferry_client::Result<ChatSession> {
            self.created.push(request);
            Ok(ChatSession {
                id: "c-1".to_string(),
                created_at: String::new(),
                updated_at: String::new(),
                metadata: Default::default(),
            })
        }

        async fn get_chat(&self, chat_id: &str) -> ferry_client::Result<ChatSession> {
            Err(ferry_client::Error::NotFound(chat_id.to_string()))
        }

        async fn get_messages(&self, _chat_id: &str) -> ferry_client::Result<Vec<ChatMessage>> {
            Ok(vec![
                ChatMessage::new("system", "seed"),
                ChatMessage::user("earlier question"),
                ChatMessage::assistant("earlier answer"),
            ])
        }

        async fn send_message(
            &self,
            chat_id: &str,
            content: &str,
        ) -> ferry_client::Result<ChatExchange> {
            self.sent.push((chat_id.to_string(), content.to_string()));
            Ok(ChatExchange {
                message: ChatMessage::user(content),
                response: ChatMessage::assistant("service says hi"),
            })
        }

        async fn delete_chat(&self, _chat_id: &str) -> ferry_client::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_connected_with_tool_routes_to_tool() {
        let executor = FakeExecutor::new(ConnectionState::Connected);
        let service = Arc::new(FakeService::default());
        let mut conversation =
            Conversation::new(executor.clone(), service.clone()).with_tool(Some("search".into()));

        let first = conversation.send("hello").await.unwrap();
        assert!(matches!(first, Reply::Tool { ref tool, .. } if tool == "search"));
        conversation.send("  again  ").await.unwrap();

        let calls = executor.calls.all();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "search");
        assert_eq!(calls[0].1, json!({"query": "hello", "chat_history": []}));
        assert_eq!(
            calls[1].1,
            json!({
                "query": "again",
                "chat_history": [
                    {"role": "user", "content": "hello"},
                    {"role": "assistant", "content": "tool says hi #1"}
                ]
            })
        );
        assert!(service.sent.all().is_empty());
        assert!(service.created.all().is_empty());
        assert_eq!(conversation.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_disconnected_routes_to_service() {
        let executor = FakeExecutor::new(ConnectionState::Disconnected);
        let service = Arc::new(FakeService::default());
        let mut conversation =
            Conversation::new(executor.clone(), service.clone()).with_tool(Some("search".into()));

        assert!(!conversation.routes_to_tool());
        let reply = conversation.send("hello").await.unwrap();

        assert_eq!(reply.text(), "service says hi");
        assert!(executor.calls.all().is_empty());
        assert_eq!(service.sent.all(), vec![("c-1".to_string(), "hello".to_string())]);
        assert_eq!(conversation.chat_id(), Some("c-1"));
        let created = service.created.all();
        assert_eq!(created.len(), 1);
        assert_eq!(
            created[0].metadata.as_ref().unwrap()["mcp_tool"],
            json!("search")
        );
    }

    #[tokio::test]
    async fn test_no_tool_routes_to_service_and_reuses_chat() {
        let executor = FakeExecutor::new(ConnectionState::Connected);
        let service = Arc::new(FakeService::default());
        let mut conversation = Conversation::new(executor.clone(), service.clone());

        conversation.send("one").await.unwrap();
        conversation.send("two").await.unwrap();

        assert!(executor.calls.all().is_empty());
        assert_eq!(service.created.all().len(), 1);
        assert_eq!(service.sent.all().len(), 2);
    }

    #[tokio::test]
    async fn test_resume_hides_system_and_feeds_history() {
        let executor = FakeExecutor::new(ConnectionState::Connected);
        let service = Arc::new(FakeService::default());
        let mut conversation =
            Conversation::new(executor.clone(), service).with_tool(Some("search".into()));

        conversation.resume("c-9").await.unwrap();
        assert_eq!(conversation.chat_id(), Some("c-9"));
        assert_eq!(conversation.transcript().len(), 2);

        conversation.send("follow up").await.unwrap();
        assert_eq!(
            executor.calls.all()[0].1["chat_history"],
            json!([
                {"role": "user", "content": "earlier question"},
                {"role": "assistant", "content": "earlier answer"}
            ])
        );
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_no_orphaned_message() {
        let executor = FakeExecutor::new(ConnectionState::Connected);
        let service = Arc::new(FakeService::default());
        let mut conversation =
            Conversation::new(executor.clone(), service).with_tool(Some("search".into()));

        executor.set_failing(true);
        assert!(conversation.send("lost").await.is_err());
        assert!(conversation.transcript().is_empty());

        executor.set_failing(false);
        conversation.send("hello").await.unwrap();
        let calls = executor.calls.all();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1, json!({"query": "hello", "chat_history": []}));
        assert_eq!(conversation.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let executor = FakeExecutor::new(ConnectionState::Connected);
        let service = Arc::new(FakeService::default());
        let mut conversation = Conversation::new(executor, service);

        assert!(conversation.send("   ").await.is_err());
        assert!(conversation.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_reset_starts_new_chat() {
        let executor = FakeExecutor::new(ConnectionState::Disconnected);
        let service = Arc::new(FakeService::default());
        let mut conversation = Conversation::new(executor, service.clone());

        conversation.send("one").await.unwrap();
        conversation.reset();
        assert!(conversation.chat_id().is_none());
        assert!(conversation.transcript().is_empty());

        conversation.send("two").await.unwrap();
        assert_eq!(service.created.all().len(), 2);
    }

    #[test]
    fn test_empty_tool_reply_text() {
        let reply = Reply::Tool {
            tool: "t".into(),
            result: ExecutionResult::default(),
        };
        assert_eq!(reply.text(), "No response from tool");
    }
}
