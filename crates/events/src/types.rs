//! Event types for the Quorum progress stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// Session this event belongs to
    pub session_id: Uuid,
    /// Position in the session's append-only log, starting at 0
    pub seq: u64,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create an envelope with auto-generated ID and timestamp. The sequence
    /// number is assigned by the bus at publish time.
    pub fn new(session_id: Uuid, event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            seq: 0,
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All events a pipeline session can stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Session accepted and scheduled
    #[serde(rename = "session.started")]
    SessionStarted { query_text: String },

    /// A phase began running
    #[serde(rename = "phase.started")]
    PhaseStarted { phase_id: String },

    /// A phase finished successfully
    #[serde(rename = "phase.completed")]
    PhaseCompleted { phase_id: String },

    /// A conditional phase's predicate evaluated false
    #[serde(rename = "phase.skipped")]
    PhaseSkipped { phase_id: String, reason: String },

    /// A phase attempt failed; `will_retry` distinguishes a retry from a
    /// terminal failure
    #[serde(rename = "phase.failed")]
    PhaseFailed {
        phase_id: String,
        error: String,
        will_retry: bool,
    },

    /// Federated retrieval finished
    #[serde(rename = "retrieval.completed")]
    RetrievalCompleted {
        result_count: usize,
        degraded_backends: Vec<String>,
    },

    /// Supervisor dispatched domain agents
    #[serde(rename = "agents.dispatched")]
    AgentsDispatched { agent_types: Vec<String> },

    /// One domain agent returned (or was simulated)
    #[serde(rename = "agent.completed")]
    AgentCompleted {
        agent_type: String,
        confidence: f64,
        is_simulation: bool,
    },

    /// Context budget computed for the final answer call
    #[serde(rename = "budget.allocated")]
    BudgetAllocated { final_budget: u32 },

    /// Intermediate phase output (streaming execution mode only)
    #[serde(rename = "answer.partial")]
    AnswerPartial { text: String },

    /// Terminal: session completed with an answer
    #[serde(rename = "session.completed")]
    SessionCompleted {
        answer: String,
        confidence: f64,
        degraded: bool,
    },

    /// Terminal: session failed, no answer emitted
    #[serde(rename = "session.failed")]
    SessionFailed { error: String },

    /// Terminal: session cancelled by the caller
    #[serde(rename = "session.aborted")]
    SessionAborted,
}

impl Event {
    /// Whether this event closes the session's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::SessionCompleted { .. } | Event::SessionFailed { .. } | Event::SessionAborted
        )
    }
}
