//! Core domain types shared across the Quorum pipeline crates.

pub mod domain;
pub mod error;
pub mod traits;

pub use domain::agent::{AgentResult, AgentResultStatus, AgentTask, AgentType};
pub use domain::phase::{ExecutorType, PhaseRecord, PhaseStatus};
pub use domain::search::{BackendKind, BackendScores, SearchResult, SearchWeights};
pub use domain::session::{ConversationTurn, QuerySession, SessionStatus, TurnRole};
pub use error::CoreError;
pub use traits::{Completion, CompletionRequest, LanguageModel, LanguageModelError};
