//! Phase handlers, one per executor type, plus the helpers they share.

mod agent_coordination;
mod language_model;
mod supervisor;

pub use agent_coordination::AgentCoordinationPhase;
pub use language_model::LanguageModelPhase;
pub use supervisor::{classify_intent, SupervisorPhase};

use agents::synthesize;
use events::Event;
use quorum_core::{AgentTask, AgentType};
use retrieval::SearchRequest;
use tracing::debug;

use crate::context::PipelineContext;
use crate::session::SessionEntry;

/// Run federated retrieval once per session, memoized on the entry. Both
/// the language-model and agent handlers call this; whichever phase needs
/// context first pays for it.
pub(crate) async fn ensure_retrieval(ctx: &PipelineContext, entry: &mut SessionEntry) {
    if entry.outputs.retrieval.is_some() {
        return;
    }

    let mut request =
        SearchRequest::new(entry.session.query_text.clone(), ctx.settings.top_k)
            .with_weights(entry.weights);
    request.filters = entry.filters.clone();

    let response = ctx.retrieval.search(&request).await;

    ctx.bus.publish(
        entry.session.id,
        Event::RetrievalCompleted {
            result_count: response.results.len(),
            degraded_backends: response
                .degraded_backends
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect(),
        },
    );

    if !response.success {
        entry.outputs.degraded = true;
    }
    entry.outputs.retrieval = Some(response);
}

/// Dispatch the selected agents, stream their completions, and fold the
/// synthesis into the session outputs. Never fails: unavailable agents
/// arrive as flagged simulated results.
pub(crate) async fn run_agent_flow(
    ctx: &PipelineContext,
    entry: &mut SessionEntry,
    selected: Vec<AgentType>,
) {
    if selected.is_empty() {
        debug!(session_id = %entry.session.id, "no agents selected");
        return;
    }

    ctx.bus.publish(
        entry.session.id,
        Event::AgentsDispatched {
            agent_types: selected.iter().map(|kind| kind.as_str().to_string()).collect(),
        },
    );

    let session_id = entry.session.id;
    let query_text = entry.session.query_text.clone();
    let history = entry.session.conversation_history.clone();
    let context = entry.outputs.retrieval_results().to_vec();

    let results = ctx
        .coordinator
        .execute_agents(&selected, |agent_type| AgentTask {
            session_id,
            agent_type,
            query_text: query_text.clone(),
            conversation_history: history.clone(),
            context: context.clone(),
        })
        .await;

    let mut completed: Vec<&AgentType> = results.keys().collect();
    completed.sort_by_key(|kind| kind.as_str());
    for kind in completed {
        let result = &results[kind];
        ctx.bus.publish(
            session_id,
            Event::AgentCompleted {
                agent_type: kind.as_str().to_string(),
                confidence: result.confidence_score,
                is_simulation: result.is_simulation,
            },
        );
    }

    let synthesis = synthesize(
        &results,
        entry.outputs.retrieval_results(),
        &ctx.synthesis_policy,
    );
    if synthesis.degraded {
        entry.outputs.degraded = true;
    }
    entry.outputs.agent_results.extend(results);
    entry.outputs.synthesis = Some(synthesis);
}
