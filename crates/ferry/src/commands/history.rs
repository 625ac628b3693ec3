//! History command - show or delete a stored chat.

use anyhow::Result;
use clap::Args;
use console::style;

use ferry_client::{ChatService, ROLE_ASSISTANT, ROLE_USER};

use super::Context;
use super::output::{print_dim, print_success};

/// Arguments for the history command.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// ID of the chat
    pub chat_id: String,

    /// Include system messages
    #[arg(long)]
    pub all: bool,

    /// Delete the chat instead of showing it
    #[arg(long)]
    pub delete: bool,
}

/// Run the history command.
pub async fn run(args: HistoryArgs, ctx: &Context) -> Result<()> {
    let client = ctx.chat_client()?;

    if args.delete {
        client.delete_chat(&args.chat_id).await?;
        if ctx.json_output {
            println!("{}", serde_json::json!({ "deleted": args.chat_id }));
        } else {
            print_success(&format!("Deleted chat {}", args.chat_id));
        }
        return Ok(());
    }

    let messages: Vec<_> = client
        .get_messages(&args.chat_id)
        .await?
        .into_iter()
        .filter(|m| args.all || !m.is_system())
        .collect();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        print_dim("No messages");
        return Ok(());
    }

    for message in &messages {
        let role = match message.role.as_str() {
            ROLE_USER => style("you").bold(),
            ROLE_ASSISTANT => style("bot").cyan(),
            _ => style("system").dim(),
        };
        match (&message.created_at, ctx.verbose) {
            (Some(at), true) => println!("{} {} {}", style(at).dim(), role, message.content),
            _ => println!("{} {}", role, message.content),
        }
    }
    Ok(())
}
