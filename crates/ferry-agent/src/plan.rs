//! Plan data model and static validation.

use std::collections::HashSet;
use std::fmt;

use ferry_mcp::{ExecutionResult, ToolDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Steps
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a single step: `Pending → Running → {Success | Error}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not yet attempted.
    #[default]
    Pending,
    /// Tool call in flight.
    Running,
    /// Tool call returned a result.
    Success,
    /// Tool call failed.
    Error,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One tool invocation within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub description: String,
    pub tool: String,
    pub arguments: Value,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanStep {
    /// Create a pending step.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        tool: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            tool: tool.into(),
            arguments,
            status: StepStatus::Pending,
            result: None,
            error: None,
        }
    }

    /// Return the step to `Pending`, dropping any outcome.
    pub fn reset(&mut self) {
        self.status = StepStatus::Pending;
        self.result = None;
        self.error = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plan
// ─────────────────────────────────────────────────────────────────────────────

/// Overall state of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PlanStatus {
    /// The step at the cursor has not started.
    Pending,
    /// The step at the cursor is in flight.
    Running,
    /// Every step succeeded.
    Completed,
    /// The step at the cursor failed; the plan is halted.
    Failed {
        /// Index of the failed step.
        index: usize,
        /// Error message of the failed step.
        error: String,
    },
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Running => f.write_str("running"),
            Self::Completed => f.write_str("completed"),
            Self::Failed { index, error } => write!(f, "failed at step {}: {}", index + 1, error),
        }
    }
}

/// A goal and the ordered steps that pursue it.
///
/// The cursor points at the next step to run. It only moves forward, and
/// only past a step that succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    pub steps: Vec<PlanStep>,
    pub cursor: usize,
}

impl Plan {
    /// Create a plan with every step reset to `Pending` and the cursor at 0.
    ///
    /// Step ids must be unique.
    pub fn new(goal: impl Into<String>, mut steps: Vec<PlanStep>) -> Result<Self> {
        let mut seen = HashSet::new();
        for step in &mut steps {
            if !seen.insert(step.id.clone()) {
                return Err(AgentError::DuplicateStepId(step.id.clone()));
            }
            step.reset();
        }

        Ok(Self {
            goal: goal.into(),
            steps,
            cursor: 0,
        })
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at the cursor, or `None` once every step succeeded.
    pub fn current_step(&self) -> Option<&PlanStep> {
        self.steps.get(self.cursor)
    }

    /// Whether every step succeeded.
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    /// Overall state derived from the step at the cursor.
    pub fn status(&self) -> PlanStatus {
        match self.current_step() {
            None => PlanStatus::Completed,
            Some(step) => match step.status {
                StepStatus::Pending | StepStatus::Success => PlanStatus::Pending,
                StepStatus::Running => PlanStatus::Running,
                StepStatus::Error => PlanStatus::Failed {
                    index: self.cursor,
                    error: step.error.clone().unwrap_or_default(),
                },
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// A mismatch between a plan and the tools a host offers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanIssue {
    /// The step names a tool the host does not list.
    #[error("step '{step_id}': unknown tool '{tool}'")]
    UnknownTool {
        /// The offending step.
        step_id: String,
        /// The tool it names.
        tool: String,
    },

    /// The step's arguments are not a JSON object.
    #[error("step '{step_id}': arguments must be an object")]
    ArgumentsNotObject {
        /// The offending step.
        step_id: String,
    },

    /// An argument does not match its declared kind.
    #[error("step '{step_id}': '{param}' should be a {expected}, got {actual}")]
    WrongType {
        /// The offending step.
        step_id: String,
        /// The parameter name.
        param: String,
        /// Declared kind.
        expected: &'static str,
        /// The value supplied.
        actual: String,
    },
}

/// Check every step against the listed tools.
///
/// Arguments are checked only against parameters the tool declares with a
/// primitive kind; undeclared arguments pass through.
pub fn validate_plan(plan: &Plan, tools: &[ToolDescriptor]) -> Vec<PlanIssue> {
    let mut issues = Vec::new();

    for step in &plan.steps {
        let Some(tool) = tools.iter().find(|t| t.name == step.tool) else {
            issues.push(PlanIssue::UnknownTool {
                step_id: step.id.clone(),
                tool: step.tool.clone(),
            });
            continue;
        };

        let Some(arguments) = step.arguments.as_object() else {
            issues.push(PlanIssue::ArgumentsNotObject {
                step_id: step.id.clone(),
            });
            continue;
        };

        for (param, value) in arguments {
            if let Some(kind) = tool.param(param)
                && !kind.accepts(value)
            {
                issues.push(PlanIssue::WrongType {
                    step_id: step.id.clone(),
                    param: param.clone(),
                    expected: kind.label(),
                    actual: value.to_string(),
                });
            }
        }
    }

    issues
}
