//! Draft-answer synthesis from agent results and retrieval context.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use quorum_core::{AgentResult, AgentType, SearchResult};

/// Confidence weighting policy. The fixed ceiling for runs containing any
/// simulated contribution is deliberately conservative: simulated data can
/// lower confidence but can never raise it past the ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisPolicy {
    pub agent_weight: f64,
    pub retrieval_weight: f64,
    /// Multiplicative penalty applied once per simulated contribution.
    pub simulation_penalty: f64,
    /// Hard ceiling when any contribution is simulated.
    pub simulated_ceiling: f64,
    /// Confidence when every agent failed.
    pub failure_floor: f64,
}

impl Default for SynthesisPolicy {
    fn default() -> Self {
        Self {
            agent_weight: 0.6,
            retrieval_weight: 0.4,
            simulation_penalty: 0.85,
            simulated_ceiling: 0.6,
            failure_floor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synthesis {
    pub draft_answer: String,
    pub confidence: f64,
    pub simulated_agents: Vec<AgentType>,
    pub degraded: bool,
}

/// Combine agent results and retrieval context into a draft answer and a
/// confidence score.
///
/// Simulated contributions are surfaced in the answer text, penalize the
/// confidence, and cap it at the policy ceiling. An all-simulated agent set
/// clamps confidence to the failure floor without raising any error.
pub fn synthesize(
    agent_results: &HashMap<AgentType, AgentResult>,
    retrieval_results: &[SearchResult],
    policy: &SynthesisPolicy,
) -> Synthesis {
    let mut simulated_agents: Vec<AgentType> = agent_results
        .values()
        .filter(|result| result.is_simulation)
        .map(|result| result.agent_type)
        .collect();
    simulated_agents.sort_by_key(|kind| kind.as_str());

    let retrieval_relevance = if retrieval_results.is_empty() {
        0.0
    } else {
        retrieval_results
            .iter()
            .map(|result| result.fused_score)
            .sum::<f64>()
            / retrieval_results.len() as f64
    };

    let all_agents_simulated = !agent_results.is_empty()
        && simulated_agents.len() == agent_results.len();

    let confidence = if all_agents_simulated {
        policy.failure_floor
    } else {
        let agent_confidence = if agent_results.is_empty() {
            // No agents ran (basic query or skipped supervisor): fold the
            // agent share back into retrieval so confidence is not diluted
            // by a component that was never in play.
            retrieval_relevance
        } else {
            agent_results
                .values()
                .map(|result| result.confidence_score)
                .sum::<f64>()
                / agent_results.len() as f64
        };

        let mut combined = policy.agent_weight * agent_confidence
            + policy.retrieval_weight * retrieval_relevance;
        for _ in &simulated_agents {
            combined *= policy.simulation_penalty;
        }
        if !simulated_agents.is_empty() {
            combined = combined.min(policy.simulated_ceiling);
        }
        combined.clamp(0.0, 1.0)
    };

    let draft_answer = compose_answer(agent_results, retrieval_results, &simulated_agents);

    info!(
        agents = agent_results.len(),
        simulated = simulated_agents.len(),
        confidence,
        "synthesis complete"
    );

    Synthesis {
        draft_answer,
        confidence,
        degraded: all_agents_simulated,
        simulated_agents,
    }
}

fn compose_answer(
    agent_results: &HashMap<AgentType, AgentResult>,
    retrieval_results: &[SearchResult],
    simulated_agents: &[AgentType],
) -> String {
    let mut sections: Vec<String> = Vec::new();

    let mut real: Vec<&AgentResult> = agent_results
        .values()
        .filter(|result| !result.is_simulation)
        .collect();
    real.sort_by(|a, b| {
        b.confidence_score
            .partial_cmp(&a.confidence_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.agent_type.as_str().cmp(b.agent_type.as_str()))
    });
    for result in real {
        sections.push(format!(
            "[{}] {}",
            result.agent_type.as_str(),
            result.summary
        ));
    }

    if let Some(top) = retrieval_results.first() {
        sections.push(format!("Context: {}", top.content));
    }

    if !simulated_agents.is_empty() {
        let names: Vec<&str> = simulated_agents.iter().map(|kind| kind.as_str()).collect();
        sections.push(format!(
            "Transparency note: contributions from {} were simulated placeholders and are not authoritative.",
            names.join(", ")
        ));
    }

    sections.join("\n\n")
}
