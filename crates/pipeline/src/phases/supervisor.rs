//! Supervisor phase: complexity and intent inference, agent selection, and
//! supervised agent dispatch.

use agents::{infer_complexity, select_agents, ComplexityCategory};
use budget::IntentType;
use serde_json::json;
use tracing::info;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::session::SessionEntry;

pub struct SupervisorPhase;

impl SupervisorPhase {
    /// Predicate gating conditional supervisor phases. Pure over session
    /// state: identical state always evaluates the same way.
    pub fn predicate(ctx: &PipelineContext, entry: &SessionEntry) -> bool {
        if !ctx.settings.supervisor_enabled {
            return false;
        }
        let complexity = infer_complexity(
            &entry.session.query_text,
            entry.outputs.chunk_count() as usize,
        );
        complexity != ComplexityCategory::Basic
    }

    pub async fn run(
        ctx: &PipelineContext,
        entry: &mut SessionEntry,
        phase_id: &str,
    ) -> Result<serde_json::Value> {
        super::ensure_retrieval(ctx, entry).await;

        let intent = classify_intent(&entry.session.query_text);
        let complexity = infer_complexity(
            &entry.session.query_text,
            entry.outputs.chunk_count() as usize,
        );
        entry.outputs.intent = Some(intent);
        entry.outputs.complexity = Some(complexity);

        let selected = select_agents(complexity, intent);
        info!(
            session_id = %entry.session.id,
            phase_id,
            complexity = complexity.as_str(),
            intent = intent.as_str(),
            agents = selected.len(),
            "supervisor evaluated query"
        );

        let agent_names: Vec<String> =
            selected.iter().map(|kind| kind.as_str().to_string()).collect();
        super::run_agent_flow(ctx, entry, selected).await;

        Ok(json!({
            "complexity": complexity.as_str(),
            "intent": intent.as_str(),
            "agents": agent_names,
            "confidence": entry.outputs.confidence(),
        }))
    }

    /// Neutral stand-in recorded when the predicate gates the phase off, so
    /// downstream phases never see missing inputs.
    pub fn neutral_output() -> serde_json::Value {
        json!({
            "complexity": ComplexityCategory::Basic.as_str(),
            "intent": IntentType::Conversational.as_str(),
            "agents": [],
            "confidence": 0.0,
        })
    }
}

/// Keyword-rule intent classification. Deterministic; order of the rules is
/// the precedence.
pub fn classify_intent(query_text: &str) -> IntentType {
    let lower = query_text.trim().to_lowercase();

    const GENERATIVE: [&str; 5] = ["write", "draft", "generate", "compose", "create"];
    if GENERATIVE.iter().any(|prefix| lower.starts_with(prefix)) {
        return IntentType::Generative;
    }

    const ANALYTICAL: [&str; 6] = ["why", "how", "analyze", "compare", "explain", " vs "];
    if ANALYTICAL.iter().any(|marker| lower.contains(marker)) {
        return IntentType::Analytical;
    }

    const FACTUAL: [&str; 5] = ["what", "who", "when", "where", "which"];
    if lower.ends_with('?') || FACTUAL.iter().any(|prefix| lower.starts_with(prefix)) {
        return IntentType::Factual;
    }

    IntentType::Conversational
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_classification_rules() {
        assert_eq!(
            classify_intent("Write a summary of the meeting"),
            IntentType::Generative
        );
        assert_eq!(
            classify_intent("Compare Postgres and SQLite for embedded use"),
            IntentType::Analytical
        );
        assert_eq!(classify_intent("what is the capital of France"), IntentType::Factual);
        assert_eq!(classify_intent("Is it raining?"), IntentType::Factual);
        assert_eq!(classify_intent("thanks, that helps"), IntentType::Conversational);
    }

    #[test]
    fn test_intent_is_deterministic() {
        let query = "How do distributed consensus protocols handle partitions";
        assert_eq!(classify_intent(query), classify_intent(query));
    }

    #[test]
    fn test_neutral_output_shape() {
        let neutral = SupervisorPhase::neutral_output();
        assert_eq!(neutral["complexity"], "basic");
        assert_eq!(neutral["agents"], json!([]));
    }
}
