use quorum_core::{LanguageModelError, SessionStatus};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Phase configuration is empty")]
    EmptyGraph,

    #[error("Duplicate phase id: {phase_id}")]
    DuplicatePhase { phase_id: String },

    #[error("Phase {from} references unknown phase {to}")]
    DanglingPhase { from: String, to: String },

    #[error("Phase graph contains a cycle through {phase_id}")]
    CyclicGraph { phase_id: String },

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Session {session_id} is already {status:?}")]
    SessionTerminal {
        session_id: Uuid,
        status: SessionStatus,
    },

    #[error("Phase {phase_id} failed: {reason}")]
    PhaseFailed { phase_id: String, reason: String },

    #[error("Language model error: {0}")]
    LanguageModel(#[from] LanguageModelError),

    #[error("Archive error: {0}")]
    Archive(#[from] db::DbError),
}

impl PipelineError {
    /// Configuration errors are fatal at load time; everything else is a
    /// runtime condition.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyGraph
                | Self::DuplicatePhase { .. }
                | Self::DanglingPhase { .. }
                | Self::CyclicGraph { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
