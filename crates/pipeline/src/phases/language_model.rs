//! Language-model phase: budget allocation, prompt assembly, completion
//! with retry.

use events::Event;
use quorum_core::CompletionRequest;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::ExecutionMode;
use crate::context::PipelineContext;
use crate::error::Result;
use crate::session::SessionEntry;

pub struct LanguageModelPhase;

impl LanguageModelPhase {
    pub async fn run(
        ctx: &PipelineContext,
        entry: &mut SessionEntry,
        phase_id: &str,
    ) -> Result<serde_json::Value> {
        super::ensure_retrieval(ctx, entry).await;

        let budget = ctx.allocator.allocate(
            ctx.settings.base_tokens,
            entry.outputs.complexity_or_default().score(),
            entry.outputs.chunk_count(),
            entry.outputs.source_diversity(),
            entry.outputs.agent_results.len() as u32,
            entry.outputs.intent_or_default(),
        );
        ctx.bus.publish(
            entry.session.id,
            Event::BudgetAllocated {
                final_budget: budget.final_budget,
            },
        );

        let prompt = build_prompt(entry);
        let request = CompletionRequest::new(prompt, budget.final_budget);

        let mut attempt: u32 = 0;
        let completion = loop {
            match ctx.language_model.complete(request.clone()).await {
                Ok(completion) => break completion,
                Err(error) if error.is_retryable() && attempt < ctx.settings.max_retries => {
                    warn!(
                        session_id = %entry.session.id,
                        phase_id,
                        attempt,
                        error = %error,
                        "language model attempt failed, retrying"
                    );
                    ctx.bus.publish(
                        entry.session.id,
                        Event::PhaseFailed {
                            phase_id: phase_id.to_string(),
                            error: error.to_string(),
                            will_retry: true,
                        },
                    );
                    tokio::time::sleep(ctx.settings.retry_backoff * 2u32.pow(attempt)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error.into()),
            }
        };

        info!(
            session_id = %entry.session.id,
            phase_id,
            tokens_used = completion.tokens_used,
            "language model phase completed"
        );

        if entry.graph.execution_mode() == ExecutionMode::Streaming {
            ctx.bus.publish(
                entry.session.id,
                Event::AnswerPartial {
                    text: completion.text.clone(),
                },
            );
        }

        entry.outputs.answer = Some(completion.text.clone());
        entry.outputs.last_budget = Some(budget);

        Ok(json!({
            "text": completion.text,
            "tokens_used": completion.tokens_used,
        }))
    }
}

fn build_prompt(entry: &SessionEntry) -> String {
    let mut sections: Vec<String> = Vec::new();

    for turn in &entry.session.conversation_history {
        sections.push(format!("{:?}: {}", turn.role, turn.content));
    }
    sections.push(format!("Question: {}", entry.session.query_text));

    let context = entry.outputs.retrieval_results();
    if !context.is_empty() {
        let snippets: Vec<String> = context
            .iter()
            .take(8)
            .map(|result| format!("- [{}] {}", result.document_id, result.content))
            .collect();
        sections.push(format!("Context:\n{}", snippets.join("\n")));
    }

    if let Some(synthesis) = &entry.outputs.synthesis {
        sections.push(format!("Agent findings:\n{}", synthesis.draft_answer));
    }

    debug!(sections = sections.len(), "prompt assembled");
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PhaseDescriptor, PipelineConfig};
    use crate::graph::PhaseGraph;
    use quorum_core::{ConversationTurn, ExecutorType, QuerySession};
    use std::sync::Arc;

    fn entry() -> SessionEntry {
        let config = PipelineConfig::new(vec![PhaseDescriptor::new(
            "answer",
            1,
            ExecutorType::LanguageModel,
        )]);
        let graph = Arc::new(PhaseGraph::validate(config).unwrap());
        SessionEntry::new(
            QuerySession::new("what is rust", vec![ConversationTurn::user("hello")]),
            graph,
        )
    }

    #[test]
    fn test_prompt_contains_query_and_history() {
        let prompt = build_prompt(&entry());
        assert!(prompt.contains("Question: what is rust"));
        assert!(prompt.contains("hello"));
        assert!(!prompt.contains("Context:"));
    }
}
