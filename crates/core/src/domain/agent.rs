use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::search::SearchResult;
use super::session::ConversationTurn;

/// Specialized domain agents the supervisor can dispatch. Each one is an
/// opaque capability with a fixed request/response contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    KnowledgeGraph,
    Documents,
    WebResearch,
    Computation,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeGraph => "knowledge_graph",
            Self::Documents => "documents",
            Self::WebResearch => "web_research",
            Self::Computation => "computation",
        }
    }

    pub fn all() -> [AgentType; 4] {
        [
            Self::KnowledgeGraph,
            Self::Documents,
            Self::WebResearch,
            Self::Computation,
        ]
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work order handed to a domain agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    pub session_id: Uuid,
    pub agent_type: AgentType,
    pub query_text: String,
    pub conversation_history: Vec<ConversationTurn>,
    /// Retrieval context the agent may draw on.
    pub context: Vec<SearchResult>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentResultStatus {
    Succeeded,
    Degraded,
}

/// Partial answer produced by one domain agent.
///
/// Simulated results stand in for an agent that timed out or failed and are
/// never presented as authoritative. `is_simulation` implies a non-empty
/// `simulation_reason`; the constructors keep that invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_type: AgentType,
    pub confidence_score: f64,
    pub summary: String,
    pub sources: Vec<String>,
    pub status: AgentResultStatus,
    pub is_simulation: bool,
    pub simulation_reason: Option<String>,
}

impl AgentResult {
    /// A genuine result from a live agent. Confidence is clamped to [0, 1].
    pub fn real(
        agent_type: AgentType,
        confidence_score: f64,
        summary: impl Into<String>,
        sources: Vec<String>,
    ) -> Self {
        Self {
            agent_type,
            confidence_score: confidence_score.clamp(0.0, 1.0),
            summary: summary.into(),
            sources,
            status: AgentResultStatus::Succeeded,
            is_simulation: false,
            simulation_reason: None,
        }
    }

    /// A synthetic placeholder substituted when the real agent was
    /// unavailable. Always flagged and always carries a reason.
    pub fn simulated(agent_type: AgentType, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            agent_type,
            confidence_score: 0.0,
            summary: format!(
                "{} agent unavailable ({}); no authoritative contribution",
                agent_type.as_str(),
                reason
            ),
            sources: Vec::new(),
            status: AgentResultStatus::Degraded,
            is_simulation: true,
            simulation_reason: Some(reason),
        }
    }
}
