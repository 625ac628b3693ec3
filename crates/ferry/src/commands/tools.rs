//! Tools command - list what the tool host exposes.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use ferry_mcp::{ToolDescriptor, default_tool};

use super::Context;
use super::output::{format_params, truncate};

/// Arguments for the tools command.
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Show full parameter schemas
    #[arg(long)]
    pub full: bool,
}

/// Run the tools command.
pub async fn run(args: ToolsArgs, ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;
    let tools = client.list_tools().await?;
    client.disconnect();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&tools[..])?);
        return Ok(());
    }

    if tools.is_empty() {
        println!("The host exposes no tools.");
        return Ok(());
    }

    print_table(&tools, args.full || ctx.verbose);
    Ok(())
}

fn print_table(tools: &[ToolDescriptor], full: bool) {
    let dim = Style::new().dim();
    let default = default_tool(tools).map(|t| t.name.as_str());
    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);

    println!("{}", style(format!("Tools ({})", tools.len())).bold());
    println!("{}", dim.apply_to("─".repeat(40)));

    for tool in tools {
        let marker = if Some(tool.name.as_str()) == default {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<width$}  {}",
            marker,
            style(&tool.name).cyan(),
            truncate(&tool.description, 60),
            width = width
        );

        if full {
            for (name, kind) in &tool.parameters {
                println!("      {} {}", name, dim.apply_to(kind.label()));
            }
        } else if !tool.parameters.is_empty() {
            println!(
                "  {:<width$}  {}",
                "",
                dim.apply_to(format!("({})", format_params(tool))),
                width = width
            );
        }
    }

    println!();
    println!("{}", dim.apply_to("* default tool"));
}
