//! Call command - run one tool and print its result.

use anyhow::{Result, anyhow, bail};
use clap::Args;
use serde_json::{Map, Value};

use ferry_mcp::{ParamKind, ToolDescriptor};

use super::Context;
use super::output::{print_dim, print_result};

/// Arguments for the call command.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Name of the tool to call
    pub tool: String,

    /// Argument in KEY=VALUE format, coerced to the parameter's declared type
    #[arg(long = "arg", short = 'a')]
    pub args: Vec<String>,

    /// Arguments as a JSON object (merged before --arg values)
    #[arg(long)]
    pub json_args: Option<String>,
}

/// Run the call command.
pub async fn run(args: CallArgs, ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;
    client.list_tools().await?;

    let tool = client
        .find_tool(&args.tool)
        .ok_or_else(|| anyhow!("Unknown tool '{}'. Run 'ferry tools' to list them.", args.tool))?;
    let arguments = build_arguments(&tool, args.json_args.as_deref(), &args.args)?;

    if ctx.verbose {
        print_dim(&format!("[Running: {} {}]", tool.name, arguments));
    }

    let result = client.execute_tool(&tool.name, arguments).await;
    client.disconnect();
    let result = result?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, ctx.verbose);
    }
    Ok(())
}

/// Assemble the argument object for `tool`.
fn build_arguments(tool: &ToolDescriptor, json: Option<&str>, pairs: &[String]) -> Result<Value> {
    let mut arguments = match json {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            _ => bail!("--json-args must be a JSON object"),
        },
        None => Map::new(),
    };

    for pair in pairs {
        let (key, raw) = parse_key_value(pair)?;
        let value = match tool.param(key) {
            Some(kind) => kind
                .coerce(raw)
                .map_err(|e| anyhow!("argument '{}': {}", key, e))?,
            None => ParamKind::Other(Value::Null)
                .coerce(raw)
                .map_err(|e| anyhow!("argument '{}': {}", key, e))?,
        };
        arguments.insert(key.to_string(), value);
    }

    for (name, value) in &arguments {
        if let Some(kind) = tool.param(name)
            && !kind.accepts(value)
        {
            bail!("argument '{}' should be a {}", name, kind.label());
        }
    }

    Ok(Value::Object(arguments))
}

fn parse_key_value(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("Invalid argument '{}': expected KEY=VALUE", pair),
    }
}
