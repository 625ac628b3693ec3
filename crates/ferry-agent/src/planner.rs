//! Planners turn a goal into steps.

use async_trait::async_trait;
use serde_json::json;

use crate::error::{AgentError, Result};
use crate::plan::PlanStep;

/// Produces the steps for a goal.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Plan steps for `goal`.
    async fn plan(&self, goal: &str) -> Result<Vec<PlanStep>>;
}

/// Fixed two-step planner: analyze the goal, then run the main tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubPlanner;

impl StubPlanner {
    pub const ANALYZE_TOOL: &'static str = "analyze_goal";
    pub const MAIN_TOOL: &'static str = "main_tool";
}

#[async_trait]
impl Planner for StubPlanner {
    async fn plan(&self, goal: &str) -> Result<Vec<PlanStep>> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(AgentError::planner("goal is empty"));
        }

        Ok(vec![
            PlanStep::new("1", "Analyze goal", Self::ANALYZE_TOOL, json!({ "goal": goal })),
            PlanStep::new("2", "Execute main tool", Self::MAIN_TOOL, json!({ "goal": goal })),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StepStatus;

    #[tokio::test]
    async fn test_stub_planner_steps() {
        let steps = StubPlanner.plan("summarize the report").await.unwrap();
        assert_eq!(steps.len(), 2);

        assert_eq!(steps[0].id, "1");
        assert_eq!(steps[0].description, "Analyze goal");
        assert_eq!(steps[0].tool, "analyze_goal");
        assert_eq!(steps[0].arguments, json!({"goal": "summarize the report"}));

        assert_eq!(steps[1].id, "2");
        assert_eq!(steps[1].description, "Execute main tool");
        assert_eq!(steps[1].tool, "main_tool");
        assert!(steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[tokio::test]
    async fn test_stub_planner_rejects_blank_goal() {
        let err = StubPlanner.plan("   ").await.unwrap_err();
        assert!(matches!(err, AgentError::Planner(_)));
    }
}
