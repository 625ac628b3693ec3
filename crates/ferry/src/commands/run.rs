//! Run command - plan a goal and execute it step by step.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use tokio::sync::mpsc::UnboundedReceiver;

use ferry_agent::{PlanEngine, PlanEvent, PlanStatus, validate_plan};

use super::Context;
use super::output::{print_dim, print_error, print_success, truncate};

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// The goal to pursue
    #[arg(required = true, num_args = 1..)]
    pub goal: Vec<String>,

    /// Check every step against the host's tool list before running
    #[arg(long)]
    pub check: bool,

    /// Print the plan without running it
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let goal = args.goal.join(" ");
    let client = Arc::new(ctx.connect().await?);
    let engine = PlanEngine::new(client.clone());
    let events = plan_goal(&engine, &goal).await?;

    if args.check {
        let tools = client.list_tools().await?;
        let issues = validate_plan(&engine.snapshot(), &tools);
        if !issues.is_empty() {
            for issue in &issues {
                print_error(&issue.to_string());
            }
            client.disconnect();
            bail!("plan does not match the host's tools ({} issue(s))", issues.len());
        }
    }

    if args.dry_run {
        print_plan(&engine, ctx.json_output)?;
        client.disconnect();
        return Ok(());
    }

    let json = ctx.json_output;
    if !json {
        println!("{} {}", style("Goal:").bold(), goal);
    }
    let printer = tokio::spawn(print_events(events, json, ctx.verbose));

    let status = engine.run().await;
    client.disconnect();
    drop(engine);
    let _ = printer.await;

    match status {
        PlanStatus::Completed => {
            if !json {
                print_success("Plan complete");
            }
            Ok(())
        }
        other => bail!("plan {}", other),
    }
}

/// Subscribe, then install the plan for `goal`, so the receiver sees
/// `PlanReplaced` first.
async fn plan_goal(engine: &PlanEngine, goal: &str) -> Result<UnboundedReceiver<PlanEvent>> {
    let events = engine.subscribe();
    engine.set_goal(goal).await?;
    Ok(events)
}

async fn print_events(mut events: UnboundedReceiver<PlanEvent>, json: bool, verbose: bool) {
    while let Some(event) = events.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "could not encode plan event"),
            }
        } else {
            print_event(&event, verbose);
        }
    }
}

fn print_plan(engine: &PlanEngine, json: bool) -> Result<()> {
    let plan = engine.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{} {}", style("Goal:").bold(), plan.goal);
    for (i, step) in plan.steps.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            step.description,
            Style::new()
                .dim()
                .apply_to(format!("[{} {}]", step.tool, step.arguments))
        );
    }
    Ok(())
}

fn print_event(event: &PlanEvent, verbose: bool) {
    match event {
        PlanEvent::PlanReplaced { steps, .. } => {
            print_dim(&format!("Planned {} step(s)", steps));
        }
        PlanEvent::StepStarted {
            index, step_id, tool, ..
        } => {
            println!(
                "{} {} {}",
                style(format!("[{}]", index + 1)).cyan(),
                step_id,
                Style::new().dim().apply_to(format!("(running: {})", tool))
            );
        }
        PlanEvent::StepSucceeded { result, .. } => {
            let green = Style::new().green();
            let text = result.text();
            let summary = if verbose { text } else { truncate(&text, 120) };
            println!("    {} {}", green.apply_to("✓"), summary);
            if !result.sources.is_empty() {
                print_dim(&format!("    {} source(s)", result.sources.len()));
            }
        }
        PlanEvent::StepFailed { error, .. } => {
            let red = Style::new().red();
            println!("    {} {}", red.apply_to("✗"), error);
        }
        PlanEvent::CursorAdvanced { .. } | PlanEvent::PlanCompleted { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferry_agent::ToolExecutor;
    use ferry_mcp::ExecutionResult;
    use serde_json::Value;

    struct IdleExecutor;

    #[async_trait]
    impl ToolExecutor for IdleExecutor {
        async fn execute_tool(
            &self,
            name: &str,
            _arguments: Value,
        ) -> ferry_mcp::Result<ExecutionResult> {
            Ok(ExecutionResult::text_only(name))
        }
    }

    #[tokio::test]
    async fn test_plan_goal_receiver_sees_plan_replaced_first() {
        let engine = PlanEngine::new(Arc::new(IdleExecutor));
        let mut events = plan_goal(&engine, "ship it").await.unwrap();

        match events.try_recv().unwrap() {
            PlanEvent::PlanReplaced { goal, steps, .. } => {
                assert_eq!(goal, "ship it");
                assert_eq!(steps, engine.snapshot().steps.len());
            }
            other => panic!("expected PlanReplaced, got {:?}", other),
        }
        assert!(events.try_recv().is_err());
    }
}
