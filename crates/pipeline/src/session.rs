//! In-memory session state owned by the executor.

use std::collections::HashMap;
use std::sync::Arc;

use agents::{ComplexityCategory, Synthesis};
use budget::{IntentType, TokenBudget};
use quorum_core::{
    AgentResult, AgentType, BackendKind, PhaseRecord, PhaseStatus, QuerySession, SearchResult,
    SearchWeights, SessionStatus,
};
use retrieval::SearchResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::PhaseGraph;

/// Outputs accumulated while a session walks the phase graph. Downstream
/// phases read these through the defaulting accessors, so skipped phases
/// never leave a hole.
#[derive(Debug, Default)]
pub struct SessionOutputs {
    pub intent: Option<IntentType>,
    pub complexity: Option<ComplexityCategory>,
    pub retrieval: Option<SearchResponse>,
    pub agent_results: HashMap<AgentType, AgentResult>,
    pub synthesis: Option<Synthesis>,
    pub last_budget: Option<TokenBudget>,
    pub answer: Option<String>,
    /// Set when any phase degraded instead of failing the session.
    pub degraded: bool,
}

impl SessionOutputs {
    /// Neutral default substituted when no supervisor phase has run.
    pub fn complexity_or_default(&self) -> ComplexityCategory {
        self.complexity.unwrap_or(ComplexityCategory::Basic)
    }

    /// Neutral default substituted when no supervisor phase has run.
    pub fn intent_or_default(&self) -> IntentType {
        self.intent.unwrap_or(IntentType::Conversational)
    }

    pub fn retrieval_results(&self) -> &[SearchResult] {
        self.retrieval
            .as_ref()
            .map(|response| response.results.as_slice())
            .unwrap_or(&[])
    }

    pub fn chunk_count(&self) -> u32 {
        self.retrieval_results().len() as u32
    }

    /// Distinct backend kinds that contributed at least one score.
    pub fn source_diversity(&self) -> u32 {
        BackendKind::all()
            .iter()
            .filter(|kind| {
                self.retrieval_results()
                    .iter()
                    .any(|result| result.scores.get(**kind).is_some())
            })
            .count() as u32
    }

    /// Session confidence: the synthesis confidence when agents ran, the
    /// mean fused retrieval relevance otherwise.
    pub fn confidence(&self) -> f64 {
        if let Some(synthesis) = &self.synthesis {
            return synthesis.confidence;
        }
        let results = self.retrieval_results();
        if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.fused_score).sum::<f64>() / results.len() as f64
        }
    }

    pub fn any_simulated(&self) -> bool {
        self.agent_results.values().any(|result| result.is_simulation)
    }
}

/// Everything the executor tracks for one live session. Owned exclusively
/// by the executor; subscribers observe it through the event stream.
pub struct SessionEntry {
    pub session: QuerySession,
    pub graph: Arc<PhaseGraph>,
    pub statuses: HashMap<String, PhaseStatus>,
    pub records: Vec<PhaseRecord>,
    pub outputs: SessionOutputs,
    pub weights: SearchWeights,
    pub filters: HashMap<String, String>,
}

impl SessionEntry {
    pub fn new(session: QuerySession, graph: Arc<PhaseGraph>) -> Self {
        Self {
            session,
            graph,
            statuses: HashMap::new(),
            records: Vec::new(),
            outputs: SessionOutputs::default(),
            weights: SearchWeights::default(),
            filters: HashMap::new(),
        }
    }

    pub fn record_mut(&mut self, phase_id: &str) -> Option<&mut PhaseRecord> {
        self.records
            .iter_mut()
            .rev()
            .find(|record| record.phase_id == phase_id)
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            session_id: self.session.id,
            status: self.session.status,
            current_phase: self.session.current_phase.clone(),
            phase_history: self.records.clone(),
        }
    }
}

/// Immutable snapshot returned by `get_state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub current_phase: Option<String>,
    pub phase_history: Vec<PhaseRecord>,
}

impl SessionState {
    pub fn phases_with_status(&self, status: PhaseStatus) -> usize {
        self.phase_history
            .iter()
            .filter(|record| record.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outputs_defaults_are_neutral() {
        let outputs = SessionOutputs::default();
        assert_eq!(outputs.complexity_or_default(), ComplexityCategory::Basic);
        assert_eq!(outputs.intent_or_default(), IntentType::Conversational);
        assert!(outputs.retrieval_results().is_empty());
        assert_eq!(outputs.chunk_count(), 0);
        assert_eq!(outputs.source_diversity(), 0);
        assert_eq!(outputs.confidence(), 0.0);
    }

    #[test]
    fn test_source_diversity_counts_backend_kinds() {
        let mut outputs = SessionOutputs::default();
        let mut scores = quorum_core::BackendScores::default();
        scores.set(BackendKind::Vector, 0.9);
        scores.set(BackendKind::Keyword, 0.5);

        outputs.retrieval = Some(SearchResponse {
            success: true,
            results: vec![SearchResult {
                document_id: "a".to_string(),
                content: String::new(),
                scores,
                fused_score: 0.7,
                metadata: HashMap::new(),
            }],
            degraded_backends: vec![],
            reason: None,
        });

        assert_eq!(outputs.source_diversity(), 2);
        assert_eq!(outputs.chunk_count(), 1);
    }
}
