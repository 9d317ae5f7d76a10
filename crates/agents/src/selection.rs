//! Agent selection policy.

use budget::IntentType;
use quorum_core::AgentType;
use tracing::debug;

use crate::complexity::ComplexityCategory;

/// Pick the domain agents worth dispatching for this query. Basic queries
/// get none; the agent set grows with complexity and shifts with intent.
pub fn select_agents(complexity: ComplexityCategory, intent: IntentType) -> Vec<AgentType> {
    use AgentType::*;

    let selected: Vec<AgentType> = match (complexity, intent) {
        (ComplexityCategory::Basic, _) => vec![],

        (ComplexityCategory::Moderate, IntentType::Factual) => vec![Documents],
        (ComplexityCategory::Moderate, IntentType::Conversational) => vec![Documents],
        (ComplexityCategory::Moderate, IntentType::Analytical) => vec![Documents, KnowledgeGraph],
        (ComplexityCategory::Moderate, IntentType::Generative) => vec![Documents, WebResearch],

        (ComplexityCategory::Complex, IntentType::Factual) => vec![Documents, KnowledgeGraph],
        (ComplexityCategory::Complex, IntentType::Conversational) => vec![Documents, WebResearch],
        (ComplexityCategory::Complex, IntentType::Analytical) => {
            vec![Documents, KnowledgeGraph, Computation]
        }
        (ComplexityCategory::Complex, IntentType::Generative) => {
            vec![Documents, KnowledgeGraph, WebResearch]
        }
    };

    debug!(
        complexity = complexity.as_str(),
        intent = intent.as_str(),
        agents = selected.len(),
        "agents selected"
    );
    selected
}
