//! Plan engine for Ferry.
//!
//! A [`Plan`] is a goal plus an ordered list of [`PlanStep`]s, each bound to
//! one tool call. The [`PlanEngine`] runs them strictly in order through a
//! [`ToolExecutor`] (normally a connected [`ferry_mcp::McpClient`]) and stops
//! at the first failure.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ferry_agent::{PlanEngine, PlanStatus};
//!
//! let engine = PlanEngine::new(Arc::new(client));
//! engine.set_goal("summarize the quarterly report").await?;
//! match engine.run().await {
//!     PlanStatus::Completed => println!("done"),
//!     status => println!("{}", status),
//! }
//! ```

pub mod engine;
pub mod error;
pub mod executor;
pub mod plan;
pub mod planner;

pub use engine::{PlanEngine, PlanEvent, StepOutcome};
pub use error::{AgentError, Result};
pub use executor::ToolExecutor;
pub use plan::{Plan, PlanIssue, PlanStatus, PlanStep, StepStatus, validate_plan};
pub use planner::{Planner, StubPlanner};
