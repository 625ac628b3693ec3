//! REPL (Read-Eval-Print Loop) implementation for interactive chat.

use std::sync::Arc;

use anyhow::Result;
use console::{Style, Term, style};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use ferry_mcp::{McpClient, default_tool};

use super::chat::{Conversation, Reply};
use super::output::{format_params, print_dim, print_error, print_sources, truncate};

/// REPL state and configuration.
pub struct Repl {
    conversation: Conversation,
    client: Arc<McpClient>,
    editor: Editor<(), DefaultHistory>,
    term: Term,
    verbose: bool,
}

impl Repl {
    /// Create a new REPL instance.
    pub fn new(conversation: Conversation, client: Arc<McpClient>, verbose: bool) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .build();

        let editor = Editor::with_config(config)?;

        Ok(Self {
            conversation,
            client,
            editor,
            term: Term::stdout(),
            verbose,
        })
    }

    /// Run the REPL loop.
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            let prompt = self.format_prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    if line.starts_with('/') {
                        match self.handle_slash_command(line).await {
                            Ok(ControlFlow::Continue) => continue,
                            Ok(ControlFlow::Exit) => break,
                            Err(e) => {
                                print_error(&format!("Command error: {}", e));
                                continue;
                            }
                        }
                    }

                    self.send_message(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    print_dim("(Interrupted - type /quit to exit)");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    print_error(&format!("Input error: {}", e));
                    break;
                }
            }
        }

        print_dim("Goodbye!");
        Ok(())
    }

    async fn send_message(&mut self, message: &str) {
        if self.conversation.routes_to_tool()
            && let Some(tool) = self.conversation.tool()
        {
            print_dim(&format!("[Running: {}]", tool));
        }

        match self.conversation.send(message).await {
            Ok(reply) => {
                println!("{}", reply.text());
                if let Reply::Tool { result, .. } = &reply
                    && !result.sources.is_empty()
                {
                    print_sources(&result.sources);
                }
                println!();
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat turn failed");
                print_error(&format!("Unable to fetch response: {}", e));
            }
        }
    }

    /// Handle a slash command.
    async fn handle_slash_command(&mut self, input: &str) -> Result<ControlFlow> {
        let parts: Vec<&str> = input[1..].split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");
        let args = &parts[1..];

        match cmd {
            "quit" | "q" | "exit" => {
                return Ok(ControlFlow::Exit);
            }
            "help" | "h" | "?" => {
                self.print_help();
            }
            "clear" | "cls" => {
                self.term.clear_screen()?;
            }
            "status" => {
                self.print_status();
            }
            "tools" => {
                self.print_tools().await?;
            }
            "tool" => match args.first() {
                None => match self.conversation.tool() {
                    Some(tool) => println!("Current tool: {}", tool),
                    None => print_dim("No tool selected (turns go to the chat service)"),
                },
                Some(&"none") | Some(&"off") => {
                    self.conversation.select_tool(None);
                    print_dim("Tool deselected; turns go to the chat service");
                }
                Some(name) => {
                    let tools = self.client.list_tools().await?;
                    if tools.iter().any(|t| t.name == *name) {
                        self.conversation.select_tool(Some(name.to_string()));
                        print_dim(&format!("Using tool {}", name));
                    } else {
                        print_error(&format!("Unknown tool: {}", name));
                    }
                }
            },
            "connect" => {
                self.client.connect().await?;
                if self.conversation.tool().is_none() {
                    let tools = self.client.list_tools().await?;
                    self.conversation
                        .select_tool(default_tool(&tools).map(|t| t.name.clone()));
                }
                self.print_status();
            }
            "disconnect" => {
                self.client.disconnect();
                self.print_status();
            }
            "history" => {
                self.print_history();
            }
            "new" => {
                self.conversation.reset();
                print_dim("Started new chat");
            }
            "chat" => match self.conversation.chat_id() {
                Some(id) => println!("Current chat: {}", id),
                None => print_dim("No active chat (created on the first service turn)"),
            },
            "" => {
                print_dim("Type /help for available commands");
            }
            _ => {
                print_error(&format!("Unknown command: /{}", cmd));
                print_dim("Type /help for available commands");
            }
        }

        Ok(ControlFlow::Continue)
    }

    fn print_welcome(&self) {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("Ferry Chat").bold().cyan());
        println!("{}", dim.apply_to("─".repeat(40)));
        match (self.conversation.routes_to_tool(), self.conversation.tool()) {
            (true, Some(tool)) => println!("{}", dim.apply_to(format!("Turns go to tool {}.", tool))),
            _ => println!("{}", dim.apply_to("Turns go to the chat service.")),
        }
        println!("{}", dim.apply_to("Use /help for commands, Ctrl+D to exit."));
        println!();
    }

    fn print_help(&self) {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("Available Commands").bold());
        println!("{}", dim.apply_to("─".repeat(40)));
        println!("  {}  - Exit the REPL", style("/quit, /q").cyan());
        println!("  {}  - Show this help", style("/help, /h, /?").cyan());
        println!("  {}  - Clear the screen", style("/clear").cyan());
        println!("  {}  - Show connection and routing", style("/status").cyan());
        println!("  {}  - List the host's tools", style("/tools").cyan());
        println!(
            "  {}  - Show, select or drop the tool",
            style("/tool [name|none]").cyan()
        );
        println!("  {}  - Connect to the tool host", style("/connect").cyan());
        println!("  {}  - Disconnect from the tool host", style("/disconnect").cyan());
        println!("  {}  - Show this chat's messages", style("/history").cyan());
        println!("  {}  - Start a new chat", style("/new").cyan());
        println!("  {}  - Show current chat ID", style("/chat").cyan());
        println!();
        println!("{}", dim.apply_to("Keyboard shortcuts:"));
        println!("  {} - Interrupt current input", dim.apply_to("Ctrl+C"));
        println!("  {} - Exit the REPL", dim.apply_to("Ctrl+D"));
        println!();
    }

    fn print_status(&self) {
        let dim = Style::new().dim();
        if self.client.is_connected() {
            let green = Style::new().green();
            println!(
                "Tool host: {} {}",
                green.apply_to("● connected"),
                dim.apply_to(&self.client.config().endpoint)
            );
        } else {
            let red = Style::new().red();
            println!(
                "Tool host: {} {}",
                red.apply_to("● disconnected"),
                dim.apply_to(&self.client.config().endpoint)
            );
            if self.verbose
                && let Some(error) = self.client.last_error()
            {
                println!("  {}", dim.apply_to(format!("Last error: {}", error)));
            }
        }

        let route = if self.conversation.routes_to_tool() {
            format!("tool {}", self.conversation.tool().unwrap_or_default())
        } else {
            "chat service".to_string()
        };
        println!("Routing:   {}", route);
    }

    async fn print_tools(&self) -> Result<()> {
        let dim = Style::new().dim();
        let tools = self.client.list_tools().await?;
        if tools.is_empty() {
            print_dim("The host exposes no tools");
            return Ok(());
        }
        for tool in tools.iter() {
            let marker = if Some(tool.name.as_str()) == self.conversation.tool() {
                "*"
            } else {
                " "
            };
            println!(
                "{} {} {}",
                marker,
                style(&tool.name).cyan(),
                dim.apply_to(truncate(&tool.description, 60))
            );
            if self.verbose && !tool.parameters.is_empty() {
                println!("    {}", dim.apply_to(format_params(tool)));
            }
        }
        Ok(())
    }

    fn print_history(&self) {
        let transcript = self.conversation.transcript();
        if transcript.is_empty() {
            print_dim("No messages yet");
            return;
        }
        for message in transcript {
            let role = if message.role == ferry_client::ROLE_USER {
                style("you").bold()
            } else {
                style("bot").cyan()
            };
            println!("{} {}", role, message.content);
        }
    }

    fn format_prompt(&self) -> String {
        format!("{} ", style("ferry>").cyan().bold())
    }
}

/// Control flow for the REPL.
pub enum ControlFlow {
    Continue,
    Exit,
}
