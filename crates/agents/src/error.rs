use thiserror::Error;

use quorum_core::AgentType;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent {agent} execution failed: {reason}")]
    ExecutionFailed { agent: AgentType, reason: String },

    #[error("Agent {agent} timed out after {timeout_ms}ms")]
    Timeout { agent: AgentType, timeout_ms: u64 },

    #[error("No agent registered for type {0:?}")]
    NotRegistered(AgentType),
}

pub type Result<T> = std::result::Result<T, AgentError>;
