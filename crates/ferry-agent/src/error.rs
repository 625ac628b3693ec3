//! Error types for the plan engine.

use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for plan engine operations.
///
/// Tool failures during a step never surface here; they become step state.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Two steps share an id.
    #[error("duplicate step id: {0}")]
    DuplicateStepId(String),

    /// The planner could not produce steps.
    #[error("planning failed: {0}")]
    Planner(String),
}

impl AgentError {
    /// Create a planner error.
    pub fn planner(msg: impl Into<String>) -> Self {
        Self::Planner(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::DuplicateStepId("2".into());
        assert_eq!(err.to_string(), "duplicate step id: 2");

        let err = AgentError::planner("empty goal");
        assert_eq!(err.to_string(), "planning failed: empty goal");
    }
}
