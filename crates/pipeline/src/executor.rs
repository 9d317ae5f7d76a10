//! The phase graph executor: owns all live sessions and drives each one
//! through its validated phase DAG.
//!
//! Phases within a session run strictly sequentially under the session's
//! lock; different sessions never block each other. Cancellation is
//! cooperative: the flag is checked before a phase is scheduled and after a
//! suspension point returns, and in-flight results are discarded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use db::ArchivedSession;
use events::{Event, EventEnvelope};
use quorum_core::{
    ConversationTurn, ExecutorType, PhaseRecord, PhaseStatus, QuerySession, SearchWeights,
    SessionStatus,
};
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::error::{PipelineError, Result};
use crate::graph::PhaseGraph;
use crate::phases::{AgentCoordinationPhase, LanguageModelPhase, SupervisorPhase};
use crate::session::{SessionEntry, SessionState};

/// Query submission, the pipeline's public entry point.
#[derive(Debug, Clone)]
pub struct SubmitQuery {
    pub query_text: String,
    /// Prior session to continue a conversation from.
    pub session_id: Option<Uuid>,
    pub conversation_history: Vec<ConversationTurn>,
    pub enable_streaming: bool,
    pub weights: Option<SearchWeights>,
    pub filters: HashMap<String, String>,
}

impl SubmitQuery {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            session_id: None,
            conversation_history: Vec::new(),
            enable_streaming: true,
            weights: None,
            filters: HashMap::new(),
        }
    }
}

/// Replay of the session so far plus a live receiver, gap-free.
pub struct SessionStream {
    pub replay: Vec<EventEnvelope>,
    pub live: broadcast::Receiver<EventEnvelope>,
}

pub struct SubmitReceipt {
    pub session_id: Uuid,
    pub stream: Option<SessionStream>,
}

/// What one `advance` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// A phase ran to completion (or degraded).
    Ran { phase_id: String },
    /// A conditional phase's predicate evaluated false.
    Skipped { phase_id: String },
    /// The session is terminal; nothing more will run.
    Terminal(SessionStatus),
}

#[derive(Clone)]
struct SessionHandle {
    entry: Arc<Mutex<SessionEntry>>,
    cancelled: Arc<AtomicBool>,
}

pub struct PhaseGraphExecutor {
    ctx: Arc<PipelineContext>,
    sessions: DashMap<Uuid, SessionHandle>,
}

impl PhaseGraphExecutor {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self {
            ctx,
            sessions: DashMap::new(),
        }
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.ctx
    }

    /// Validate the phase graph and register a new session. Fails with a
    /// configuration error if the graph is cyclic or has duplicate or
    /// dangling ids.
    pub fn start_session(
        &self,
        query_text: &str,
        conversation_history: Vec<ConversationTurn>,
        config: PipelineConfig,
    ) -> Result<Uuid> {
        self.start_session_with(
            query_text,
            conversation_history,
            config,
            SearchWeights::default(),
            HashMap::new(),
        )
    }

    pub fn start_session_with(
        &self,
        query_text: &str,
        conversation_history: Vec<ConversationTurn>,
        config: PipelineConfig,
        weights: SearchWeights,
        filters: HashMap<String, String>,
    ) -> Result<Uuid> {
        let graph = Arc::new(PhaseGraph::validate(config)?);
        let session = QuerySession::new(query_text, conversation_history);
        let session_id = session.id;

        let mut entry = SessionEntry::new(session, graph);
        entry.weights = weights;
        entry.filters = filters;

        info!(session_id = %session_id, phases = entry.graph.len(), "session started");
        self.ctx.bus.publish(
            session_id,
            Event::SessionStarted {
                query_text: query_text.to_string(),
            },
        );

        self.sessions.insert(
            session_id,
            SessionHandle {
                entry: Arc::new(Mutex::new(entry)),
                cancelled: Arc::new(AtomicBool::new(false)),
            },
        );
        Ok(session_id)
    }

    fn handle(&self, session_id: Uuid) -> Result<SessionHandle> {
        self.sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or(PipelineError::SessionNotFound(session_id))
    }

    /// Run the current phase to completion and move to the next eligible
    /// one. Exactly one phase runs per session at any time; the session
    /// lock enforces it.
    pub async fn advance(&self, session_id: Uuid) -> Result<AdvanceOutcome> {
        let handle = self.handle(session_id)?;
        let mut entry = handle.entry.lock().await;

        if entry.session.status.is_terminal() {
            return Ok(AdvanceOutcome::Terminal(entry.session.status));
        }
        if handle.cancelled.load(Ordering::SeqCst) {
            self.finalize_aborted(&mut entry);
            return Ok(AdvanceOutcome::Terminal(SessionStatus::Aborted));
        }

        let Some(descriptor) = entry.graph.next_eligible(&entry.statuses).cloned() else {
            self.finalize_completed(&mut entry);
            return Ok(AdvanceOutcome::Terminal(SessionStatus::Completed));
        };
        let phase_id = descriptor.phase_id.clone();

        // Conditional gate: skip with a neutral output so later phases
        // never observe missing inputs.
        if entry.graph.is_conditional(&phase_id) && !SupervisorPhase::predicate(&self.ctx, &entry)
        {
            let neutral = match descriptor.executor_type {
                ExecutorType::AgentCoordinator => AgentCoordinationPhase::neutral_output(),
                _ => SupervisorPhase::neutral_output(),
            };
            let mut record = PhaseRecord::pending(&phase_id);
            record.skip(neutral);
            entry.records.push(record);
            entry
                .statuses
                .insert(phase_id.clone(), PhaseStatus::Skipped);

            debug!(session_id = %session_id, phase_id = %phase_id, "conditional phase skipped");
            self.ctx.bus.publish(
                session_id,
                Event::PhaseSkipped {
                    phase_id: phase_id.clone(),
                    reason: "predicate evaluated false".to_string(),
                },
            );
            return Ok(AdvanceOutcome::Skipped { phase_id });
        }

        // Start the phase.
        entry.session.current_phase = Some(phase_id.clone());
        entry
            .statuses
            .insert(phase_id.clone(), PhaseStatus::Running);
        let mut record = PhaseRecord::pending(&phase_id);
        record.start(json!({ "query_text": entry.session.query_text }));
        entry.records.push(record);
        self.ctx.bus.publish(
            session_id,
            Event::PhaseStarted {
                phase_id: phase_id.clone(),
            },
        );

        let result = match descriptor.executor_type {
            ExecutorType::LanguageModel => {
                LanguageModelPhase::run(&self.ctx, &mut entry, &phase_id).await
            }
            ExecutorType::Supervisor => {
                SupervisorPhase::run(&self.ctx, &mut entry, &phase_id).await
            }
            ExecutorType::AgentCoordinator => {
                AgentCoordinationPhase::run(&self.ctx, &mut entry, &phase_id).await
            }
        };

        // Cooperative cancellation: the in-flight call completed, but its
        // results are discarded.
        if handle.cancelled.load(Ordering::SeqCst) {
            if let Some(record) = entry.record_mut(&phase_id) {
                record.fail("session cancelled");
            }
            entry.statuses.insert(phase_id, PhaseStatus::Failed);
            self.finalize_aborted(&mut entry);
            return Ok(AdvanceOutcome::Terminal(SessionStatus::Aborted));
        }

        match result {
            Ok(outputs) => {
                if let Some(record) = entry.record_mut(&phase_id) {
                    record.complete(outputs);
                }
                entry
                    .statuses
                    .insert(phase_id.clone(), PhaseStatus::Completed);
                entry.session.current_phase = None;
                self.ctx.bus.publish(
                    session_id,
                    Event::PhaseCompleted {
                        phase_id: phase_id.clone(),
                    },
                );
                Ok(AdvanceOutcome::Ran { phase_id })
            }
            Err(error) => match descriptor.executor_type {
                // Language-model failures exhausted their retries: the
                // session fails and a terminal event explains why.
                ExecutorType::LanguageModel => {
                    warn!(
                        session_id = %session_id,
                        phase_id = %phase_id,
                        error = %error,
                        "language model phase failed, session failed"
                    );
                    if let Some(record) = entry.record_mut(&phase_id) {
                        record.fail(error.to_string());
                    }
                    entry.statuses.insert(phase_id.clone(), PhaseStatus::Failed);
                    self.ctx.bus.publish(
                        session_id,
                        Event::PhaseFailed {
                            phase_id,
                            error: error.to_string(),
                            will_retry: false,
                        },
                    );
                    self.finalize_failed(&mut entry, error.to_string());
                    Ok(AdvanceOutcome::Terminal(SessionStatus::Failed))
                }
                // Supervisor and agent-coordination failures degrade: the
                // session continues on whatever partial results exist.
                _ => {
                    warn!(
                        session_id = %session_id,
                        phase_id = %phase_id,
                        error = %error,
                        "phase degraded"
                    );
                    entry.outputs.degraded = true;
                    if let Some(record) = entry.record_mut(&phase_id) {
                        record.complete(json!({ "degraded": true, "error": error.to_string() }));
                    }
                    entry
                        .statuses
                        .insert(phase_id.clone(), PhaseStatus::Completed);
                    entry.session.current_phase = None;
                    self.ctx.bus.publish(
                        session_id,
                        Event::PhaseCompleted {
                            phase_id: phase_id.clone(),
                        },
                    );
                    Ok(AdvanceOutcome::Ran { phase_id })
                }
            },
        }
    }

    /// Drive the session until it reaches a terminal status.
    pub async fn run_to_completion(&self, session_id: Uuid) -> Result<SessionState> {
        loop {
            match self.advance(session_id).await? {
                AdvanceOutcome::Terminal(_) => break,
                AdvanceOutcome::Ran { .. } | AdvanceOutcome::Skipped { .. } => {}
            }
        }
        self.get_state(session_id).await
    }

    pub async fn get_state(&self, session_id: Uuid) -> Result<SessionState> {
        let handle = self.handle(session_id)?;
        let entry = handle.entry.lock().await;
        Ok(entry.state())
    }

    /// Cooperative cancellation: no further phases are scheduled; the
    /// in-flight phase (if any) finishes but its results are discarded.
    pub fn cancel(&self, session_id: Uuid) -> Result<()> {
        let handle = self.handle(session_id)?;
        handle.cancelled.store(true, Ordering::SeqCst);
        info!(session_id = %session_id, "session cancellation requested");
        Ok(())
    }

    /// Submit a query: start a session and drive it in the background.
    pub fn submit(
        self: &Arc<Self>,
        request: SubmitQuery,
        config: PipelineConfig,
    ) -> Result<SubmitReceipt> {
        let mut history = request.conversation_history;
        if let Some(prior_id) = request.session_id {
            if let Some(prior) = self.sessions.get(&prior_id) {
                if let Ok(prior) = prior.value().entry.try_lock() {
                    let mut seeded = prior.session.conversation_history.clone();
                    seeded.push(ConversationTurn::user(prior.session.query_text.clone()));
                    if let Some(answer) = &prior.outputs.answer {
                        seeded.push(ConversationTurn::assistant(answer.clone()));
                    }
                    seeded.append(&mut history);
                    history = seeded;
                }
            }
        }

        let session_id = self.start_session_with(
            &request.query_text,
            history,
            config,
            request.weights.unwrap_or_default(),
            request.filters,
        )?;

        let stream = if request.enable_streaming {
            let (replay, live) = self.ctx.bus.subscribe_with_replay(session_id);
            Some(SessionStream { replay, live })
        } else {
            None
        };

        let executor = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = executor.run_to_completion(session_id).await {
                warn!(session_id = %session_id, error = %error, "session driver failed");
            }
        });

        Ok(SubmitReceipt { session_id, stream })
    }

    /// Archive and evict sessions that have been terminal for longer than
    /// the retention window, and purge their event logs. Returns how many
    /// sessions were retired.
    pub async fn retire_expired(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.ctx.settings.retention;

        let mut expired: Vec<Uuid> = Vec::new();
        for item in self.sessions.iter() {
            if let Ok(entry) = item.value().entry.try_lock() {
                if entry.session.status.is_terminal()
                    && entry.session.completed_at.is_some_and(|t| t < cutoff)
                {
                    expired.push(*item.key());
                }
            }
        }

        let mut retired = 0usize;
        for session_id in expired {
            let Some((_, handle)) = self.sessions.remove(&session_id) else {
                continue;
            };
            let entry = handle.entry.lock().await;
            if let Some(repository) = &self.ctx.archive {
                let archived = ArchivedSession {
                    id: entry.session.id,
                    query_text: entry.session.query_text.clone(),
                    status: entry.session.status,
                    phase_history: entry.records.clone(),
                    answer: entry.outputs.answer.clone().or_else(|| {
                        entry
                            .outputs
                            .synthesis
                            .as_ref()
                            .map(|s| s.draft_answer.clone())
                    }),
                    confidence: entry.outputs.synthesis.as_ref().map(|s| s.confidence),
                    created_at: entry.session.created_at,
                    completed_at: entry.session.completed_at,
                    archived_at: Utc::now(),
                };
                repository.archive(&archived).await?;
            }
            debug!(session_id = %session_id, "session retired");
            retired += 1;
        }

        self.ctx.bus.purge_expired(self.ctx.settings.retention);
        Ok(retired)
    }

    fn finalize_completed(&self, entry: &mut SessionEntry) {
        let mut answer = entry
            .outputs
            .answer
            .clone()
            .or_else(|| {
                entry
                    .outputs
                    .synthesis
                    .as_ref()
                    .map(|s| s.draft_answer.clone())
            })
            .unwrap_or_default();

        // Simulated contributions must stay visible all the way out, even
        // when the final answer text came from a later model call.
        if entry.outputs.any_simulated() && !answer.contains("simulated") {
            let mut names: Vec<&str> = entry
                .outputs
                .agent_results
                .values()
                .filter(|result| result.is_simulation)
                .map(|result| result.agent_type.as_str())
                .collect();
            names.sort();
            names.dedup();
            answer.push_str(&format!(
                "\n\nNote: contributions from {} were simulated placeholders and are not authoritative.",
                names.join(", ")
            ));
        }

        let degraded = entry.outputs.degraded || entry.outputs.any_simulated();
        entry.session.complete();
        info!(session_id = %entry.session.id, degraded, "session completed");
        self.ctx.bus.publish(
            entry.session.id,
            Event::SessionCompleted {
                answer,
                confidence: entry.outputs.confidence(),
                degraded,
            },
        );
    }

    fn finalize_failed(&self, entry: &mut SessionEntry, error: String) {
        entry.session.fail();
        self.ctx
            .bus
            .publish(entry.session.id, Event::SessionFailed { error });
    }

    fn finalize_aborted(&self, entry: &mut SessionEntry) {
        entry.session.abort();
        info!(session_id = %entry.session.id, "session aborted");
        self.ctx
            .bus
            .publish(entry.session.id, Event::SessionAborted);
    }
}
