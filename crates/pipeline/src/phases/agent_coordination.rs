//! Agent-coordination phase: unconditional fan-out to domain agents.
//!
//! Unlike the supervisor phase, this handler always dispatches: the agent
//! set comes from the current complexity/intent assessment, falling back to
//! the documents agent when the assessment selects nothing.

use agents::select_agents;
use quorum_core::AgentType;
use serde_json::json;
use tracing::info;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::session::SessionEntry;

pub struct AgentCoordinationPhase;

impl AgentCoordinationPhase {
    pub async fn run(
        ctx: &PipelineContext,
        entry: &mut SessionEntry,
        phase_id: &str,
    ) -> Result<serde_json::Value> {
        super::ensure_retrieval(ctx, entry).await;

        let mut selected = select_agents(
            entry.outputs.complexity_or_default(),
            entry.outputs.intent_or_default(),
        );
        if selected.is_empty() {
            selected = vec![AgentType::Documents];
        }

        info!(
            session_id = %entry.session.id,
            phase_id,
            agents = selected.len(),
            "coordinating agents"
        );

        let agent_names: Vec<String> =
            selected.iter().map(|kind| kind.as_str().to_string()).collect();
        super::run_agent_flow(ctx, entry, selected).await;

        let synthesis = entry.outputs.synthesis.as_ref();
        Ok(json!({
            "agents": agent_names,
            "confidence": entry.outputs.confidence(),
            "simulated": synthesis
                .map(|s| s.simulated_agents.iter().map(|a| a.as_str()).collect::<Vec<_>>())
                .unwrap_or_default(),
        }))
    }

    /// Neutral stand-in for a skipped coordination phase.
    pub fn neutral_output() -> serde_json::Value {
        json!({
            "agents": [],
            "confidence": 0.0,
            "simulated": [],
        })
    }
}
