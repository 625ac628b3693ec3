//! Sequential plan execution.
//!
//! [`PlanEngine`] owns one plan and advances it a single step at a time.
//! Each step calls exactly one tool through a [`ToolExecutor`]; success moves
//! the cursor forward, failure halts the plan until a new one is installed.
//! Every transition is published as a [`PlanEvent`].

use std::sync::Arc;

use ferry_mcp::{ConnectionState, ExecutionResult, McpError};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::error::Result;
use crate::executor::ToolExecutor;
use crate::plan::{Plan, PlanStatus, PlanStep, StepStatus};
use crate::planner::{Planner, StubPlanner};

/// A state transition of the engine's plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlanEvent {
    /// A new plan was installed.
    PlanReplaced {
        epoch: u64,
        goal: String,
        steps: usize,
    },
    /// The step at `index` is now running.
    StepStarted {
        epoch: u64,
        index: usize,
        step_id: String,
        tool: String,
    },
    /// The step at `index` returned a result.
    StepSucceeded {
        epoch: u64,
        index: usize,
        step_id: String,
        result: ExecutionResult,
    },
    /// The step at `index` failed.
    StepFailed {
        epoch: u64,
        index: usize,
        step_id: String,
        error: String,
    },
    /// The cursor moved.
    CursorAdvanced { epoch: u64, cursor: usize },
    /// Every step succeeded.
    PlanCompleted { epoch: u64 },
}

/// What a call to [`PlanEngine::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The step at `index` succeeded and the cursor moved past it.
    Advanced { index: usize },
    /// The step at `index` failed; the cursor stays on it.
    Failed { index: usize, error: String },
    /// Nothing left to run.
    Complete,
    /// The step at `index` already failed; install a new plan to continue.
    Blocked { index: usize },
    /// The plan was replaced while the step ran; its result was discarded.
    Superseded,
}

struct EngineState {
    plan: Plan,
    epoch: u64,
}

/// Drives a plan against a tool executor.
pub struct PlanEngine {
    executor: Arc<dyn ToolExecutor>,
    planner: Arc<dyn Planner>,
    state: Mutex<EngineState>,
    /// Held for the duration of a step so steps never overlap.
    drive: tokio::sync::Mutex<()>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PlanEvent>>>,
}

impl PlanEngine {
    /// Create an engine with an empty plan and the stub planner.
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            executor,
            planner: Arc::new(StubPlanner),
            state: Mutex::new(EngineState {
                plan: Plan::default(),
                epoch: 0,
            }),
            drive: tokio::sync::Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Receive every subsequent plan event.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PlanEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn publish(&self, events: Vec<PlanEvent>) {
        let mut subscribers = self.subscribers.lock();
        for event in events {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// A copy of the current plan.
    pub fn snapshot(&self) -> Plan {
        self.state.lock().plan.clone()
    }

    /// Overall state of the current plan.
    pub fn status(&self) -> PlanStatus {
        self.state.lock().plan.status()
    }

    /// Number of plans installed so far.
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Replace the whole plan and reset the cursor to 0.
    ///
    /// A step still running for the previous plan finishes in the background
    /// and its result is dropped.
    pub fn set_plan(&self, goal: impl Into<String>, steps: Vec<PlanStep>) -> Result<()> {
        let plan = Plan::new(goal, steps)?;
        let event = {
            let mut state = self.state.lock();
            state.epoch += 1;
            let event = PlanEvent::PlanReplaced {
                epoch: state.epoch,
                goal: plan.goal.clone(),
                steps: plan.len(),
            };
            tracing::info!(epoch = state.epoch, goal = %plan.goal, steps = plan.len(), "plan installed");
            state.plan = plan;
            event
        };
        self.publish(vec![event]);
        Ok(())
    }

    /// Ask the planner for steps toward `goal` and install them.
    pub async fn set_goal(&self, goal: &str) -> Result<()> {
        let steps = self.planner.plan(goal).await?;
        self.set_plan(goal.trim(), steps)
    }

    /// Run the step at the cursor, if it is pending.
    pub async fn step(&self) -> StepOutcome {
        let _drive = self.drive.lock().await;

        let (epoch, index, step_id, tool, arguments) = {
            let mut state = self.state.lock();
            let epoch = state.epoch;
            let index = state.plan.cursor;
            match state.plan.steps.get_mut(index) {
                None => return StepOutcome::Complete,
                Some(step) if step.status == StepStatus::Error => {
                    return StepOutcome::Blocked { index };
                }
                Some(step) => {
                    step.status = StepStatus::Running;
                    step.result = None;
                    step.error = None;
                    (
                        epoch,
                        index,
                        step.id.clone(),
                        step.tool.clone(),
                        step.arguments.clone(),
                    )
                }
            }
        };

        tracing::debug!(epoch, index, step_id = %step_id, tool = %tool, "step started");
        self.publish(vec![PlanEvent::StepStarted {
            epoch,
            index,
            step_id: step_id.clone(),
            tool: tool.clone(),
        }]);

        let outcome = self.invoke(&tool, arguments).await;

        let mut events = Vec::new();
        let result = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                tracing::debug!(epoch, index, "discarding result of replaced plan");
                return StepOutcome::Superseded;
            }

            let plan = &mut state.plan;
            let step = &mut plan.steps[index];
            match outcome {
                Ok(result) => {
                    step.status = StepStatus::Success;
                    step.result = Some(result.clone());
                    plan.cursor = index + 1;

                    events.push(PlanEvent::StepSucceeded {
                        epoch,
                        index,
                        step_id,
                        result,
                    });
                    events.push(PlanEvent::CursorAdvanced {
                        epoch,
                        cursor: plan.cursor,
                    });
                    if plan.is_complete() {
                        tracing::info!(epoch, goal = %plan.goal, "plan completed");
                        events.push(PlanEvent::PlanCompleted { epoch });
                    }
                    StepOutcome::Advanced { index }
                }
                Err(error) => {
                    tracing::warn!(epoch, index, step_id = %step_id, error = %error, "step failed");
                    step.status = StepStatus::Error;
                    step.error = Some(error.clone());

                    events.push(PlanEvent::StepFailed {
                        epoch,
                        index,
                        step_id,
                        error: error.clone(),
                    });
                    StepOutcome::Failed { index, error }
                }
            }
        };

        self.publish(events);
        result
    }

    /// Drive steps until the plan completes or halts.
    pub async fn run(&self) -> PlanStatus {
        loop {
            match self.step().await {
                StepOutcome::Advanced { .. } => continue,
                StepOutcome::Complete => return PlanStatus::Completed,
                StepOutcome::Failed { index, error } => return PlanStatus::Failed { index, error },
                StepOutcome::Blocked { .. } | StepOutcome::Superseded => return self.status(),
            }
        }
    }

    /// Call the tool, failing early if the session drops mid-call.
    async fn invoke(&self, tool: &str, arguments: Value) -> std::result::Result<ExecutionResult, String> {
        let call = self.executor.execute_tool(tool, arguments);

        let Some(state) = self.executor.watch_state() else {
            return call.await.map_err(|e| e.to_string());
        };

        tokio::select! {
            biased;
            result = call => result.map_err(|e| e.to_string()),
            _ = disconnected(state) => Err(McpError::ConnectionLost.to_string()),
        }
    }
}

/// Resolves once the session reports `Disconnected` or its sender is gone.
async fn disconnected(mut state: watch::Receiver<ConnectionState>) {
    let _ = state
        .wait_for(|s| *s == ConnectionState::Disconnected)
        .await;
}
