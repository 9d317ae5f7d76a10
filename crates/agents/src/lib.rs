//! Supervisor agent coordinator.
//!
//! Infers query complexity from declared signals, selects specialized
//! domain agents, fans them out concurrently with per-agent timeouts, and
//! synthesizes their partial answers with retrieval context into a draft
//! answer and confidence score. Failures degrade into flagged simulated
//! results; they never propagate past this crate.

mod complexity;
mod coordinator;
mod error;
mod selection;
mod synthesis;

pub use complexity::{infer_complexity, ComplexityCategory, ComplexitySignals};
pub use coordinator::{CoordinatorConfig, DomainAgent, SupervisorCoordinator};
pub use error::{AgentError, Result};
pub use selection::select_agents;
pub use synthesis::{synthesize, Synthesis, SynthesisPolicy};
