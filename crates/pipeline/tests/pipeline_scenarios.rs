//! End-to-end pipeline scenarios against fake collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::TryRecvError;

use agents::{AgentError, CoordinatorConfig, DomainAgent, SupervisorCoordinator};
use events::Event;
use pipeline::{
    ExecutorSettings, PhaseDescriptor, PhaseGraphExecutor, PipelineConfig, PipelineContext,
    SubmitQuery,
};
use quorum_core::{
    AgentResult, AgentTask, AgentType, BackendKind, Completion, CompletionRequest, ExecutorType,
    LanguageModel, LanguageModelError, PhaseStatus, SessionStatus,
};
use retrieval::{BackendError, BackendHit, HybridRetrievalEngine, SearchBackend};

const COMPLEX_QUERY: &str = "Analyze how the European Central Bank's 2023 rate decisions \
     affected Italian and Spanish sovereign bond spreads relative to the \
     Bundesbank forecasts published in Q3";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

struct ScriptedModel {
    reply: &'static str,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(reply: &'static str) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<Completion, LanguageModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Completion {
            text: self.reply.to_string(),
            tokens_used: 64,
        })
    }
}

struct TimingOutModel;

#[async_trait]
impl LanguageModel for TimingOutModel {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<Completion, LanguageModelError> {
        Err(LanguageModelError::Timeout { timeout_ms: 100 })
    }
}

struct StaticBackend {
    kind: BackendKind,
    hits: Vec<(&'static str, f64)>,
}

#[async_trait]
impl SearchBackend for StaticBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn query(
        &self,
        _query_text: &str,
        top_k: usize,
    ) -> Result<Vec<BackendHit>, BackendError> {
        Ok(self
            .hits
            .iter()
            .take(top_k)
            .map(|(id, score)| BackendHit::new(*id, *score).with_content(format!("chunk {}", id)))
            .collect())
    }
}

struct InstantAgent {
    kind: AgentType,
    confidence: f64,
}

#[async_trait]
impl DomainAgent for InstantAgent {
    fn kind(&self) -> AgentType {
        self.kind
    }

    async fn run(&self, _task: AgentTask) -> Result<AgentResult, AgentError> {
        Ok(AgentResult::real(
            self.kind,
            self.confidence,
            format!("{} analysis", self.kind.as_str()),
            vec!["doc".to_string()],
        ))
    }
}

struct StuckAgent(AgentType);

#[async_trait]
impl DomainAgent for StuckAgent {
    fn kind(&self) -> AgentType {
        self.0
    }

    async fn run(&self, _task: AgentTask) -> Result<AgentResult, AgentError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("stuck agent never returns in tests")
    }
}

fn retrieval_engine() -> Arc<HybridRetrievalEngine> {
    Arc::new(
        HybridRetrievalEngine::new()
            .with_backend(Arc::new(StaticBackend {
                kind: BackendKind::Vector,
                hits: vec![("A", 0.9), ("B", 0.6)],
            }))
            .with_backend(Arc::new(StaticBackend {
                kind: BackendKind::Keyword,
                hits: vec![("A", 0.4), ("C", 0.8)],
            })),
    )
}

fn full_coordinator(slow_knowledge_graph: bool) -> Arc<SupervisorCoordinator> {
    let config = CoordinatorConfig::default().with_agent_timeout(Duration::from_millis(100));
    let mut coordinator = SupervisorCoordinator::new(config)
        .with_agent(Arc::new(InstantAgent {
            kind: AgentType::Documents,
            confidence: 0.8,
        }))
        .with_agent(Arc::new(InstantAgent {
            kind: AgentType::Computation,
            confidence: 0.8,
        }))
        .with_agent(Arc::new(InstantAgent {
            kind: AgentType::WebResearch,
            confidence: 0.8,
        }));
    coordinator = if slow_knowledge_graph {
        coordinator.with_agent(Arc::new(StuckAgent(AgentType::KnowledgeGraph)))
    } else {
        coordinator.with_agent(Arc::new(InstantAgent {
            kind: AgentType::KnowledgeGraph,
            confidence: 0.8,
        }))
    };
    Arc::new(coordinator)
}

fn executor_with(
    model: Arc<dyn LanguageModel>,
    coordinator: Arc<SupervisorCoordinator>,
    settings: ExecutorSettings,
) -> Arc<PhaseGraphExecutor> {
    let ctx = PipelineContext::new(model, retrieval_engine(), coordinator).with_settings(settings);
    Arc::new(PhaseGraphExecutor::new(Arc::new(ctx)))
}

/// Six language-model phases with three conditional supervisor phases
/// interleaved, as one chain.
fn nine_phase_config() -> PipelineConfig {
    let descriptors = vec![
        PhaseDescriptor::new("classify", 1, ExecutorType::LanguageModel),
        PhaseDescriptor::new("expand", 2, ExecutorType::LanguageModel),
        PhaseDescriptor::new("supervise_scope", 3, ExecutorType::Supervisor),
        PhaseDescriptor::new("outline", 4, ExecutorType::LanguageModel),
        PhaseDescriptor::new("supervise_depth", 5, ExecutorType::Supervisor),
        PhaseDescriptor::new("draft", 6, ExecutorType::LanguageModel),
        PhaseDescriptor::new("refine", 7, ExecutorType::LanguageModel),
        PhaseDescriptor::new("supervise_final", 8, ExecutorType::Supervisor),
        PhaseDescriptor::new("answer", 9, ExecutorType::LanguageModel),
    ];
    PipelineConfig::chain(descriptors)
        .with_conditional("supervise_scope")
        .with_conditional("supervise_depth")
        .with_conditional("supervise_final")
}

#[tokio::test]
async fn scenario_a_supervisor_disabled_skips_conditional_phases() {
    init_tracing();
    let executor = executor_with(
        Arc::new(ScriptedModel::new("draft answer")),
        full_coordinator(false),
        ExecutorSettings::default().with_supervisor_enabled(false),
    );

    let session_id = executor
        .start_session(COMPLEX_QUERY, vec![], nine_phase_config())
        .unwrap();
    let state = executor.run_to_completion(session_id).await.unwrap();

    assert_eq!(state.status, SessionStatus::Completed);
    assert_eq!(state.phase_history.len(), 9);
    assert_eq!(state.phases_with_status(PhaseStatus::Completed), 6);
    assert_eq!(state.phases_with_status(PhaseStatus::Skipped), 3);

    // Every phase appears exactly once in the history.
    let mut ids: Vec<&str> = state
        .phase_history
        .iter()
        .map(|record| record.phase_id.as_str())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 9);
}

#[tokio::test]
async fn scenario_b_supervisor_enabled_runs_all_phases_and_agents() {
    init_tracing();
    let executor = executor_with(
        Arc::new(ScriptedModel::new("draft answer")),
        full_coordinator(false),
        ExecutorSettings::default(),
    );

    let mut events_rx = executor.context().bus.subscribe();
    let session_id = executor
        .start_session(COMPLEX_QUERY, vec![], nine_phase_config())
        .unwrap();
    let state = executor.run_to_completion(session_id).await.unwrap();

    assert_eq!(state.status, SessionStatus::Completed);
    assert_eq!(state.phases_with_status(PhaseStatus::Completed), 9);
    assert_eq!(state.phases_with_status(PhaseStatus::Skipped), 0);

    let mut agents_dispatched = 0usize;
    while let Ok(envelope) = events_rx.try_recv() {
        if let Event::AgentsDispatched { agent_types } = envelope.event {
            assert!(!agent_types.is_empty());
            agents_dispatched += agent_types.len();
        }
    }
    assert!(agents_dispatched >= 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_d_timed_out_agent_lowers_confidence_and_is_flagged() {
    let config = PipelineConfig::chain(vec![
        PhaseDescriptor::new("supervise", 1, ExecutorType::Supervisor),
        PhaseDescriptor::new("answer", 2, ExecutorType::LanguageModel),
    ]);

    let run = |slow: bool| {
        let config = config.clone();
        async move {
            let executor = executor_with(
                Arc::new(ScriptedModel::new("final answer")),
                full_coordinator(slow),
                ExecutorSettings::default(),
            );
            let mut events_rx = executor.context().bus.subscribe();
            let session_id = executor
                .start_session(COMPLEX_QUERY, vec![], config)
                .unwrap();
            executor.run_to_completion(session_id).await.unwrap();

            let mut completed: Option<(String, f64, bool)> = None;
            let mut simulated: Vec<(String, bool)> = Vec::new();
            while let Ok(envelope) = events_rx.try_recv() {
                match envelope.event {
                    Event::SessionCompleted {
                        answer,
                        confidence,
                        degraded,
                    } => completed = Some((answer, confidence, degraded)),
                    Event::AgentCompleted {
                        agent_type,
                        is_simulation,
                        ..
                    } => simulated.push((agent_type, is_simulation)),
                    _ => {}
                }
            }
            (completed.expect("session completed"), simulated)
        }
    };

    let ((clean_answer, clean_confidence, clean_degraded), clean_agents) = run(false).await;
    let ((slow_answer, slow_confidence, slow_degraded), slow_agents) = run(true).await;

    assert!(!clean_degraded);
    assert!(clean_agents.iter().all(|(_, simulated)| !simulated));
    assert!(!clean_answer.contains("simulated"));

    assert!(slow_degraded);
    assert!(slow_agents
        .iter()
        .any(|(agent, simulated)| agent == "knowledge_graph" && *simulated));
    assert!(slow_confidence < clean_confidence);
    // The transparency note survives into the final answer.
    assert!(slow_answer.contains("knowledge_graph"));
    assert!(slow_answer.contains("simulated"));
}

#[tokio::test]
async fn replay_matches_live_delivery_field_for_field() {
    let executor = executor_with(
        Arc::new(ScriptedModel::new("answer")),
        full_coordinator(false),
        ExecutorSettings::default(),
    );

    let mut live_rx = executor.context().bus.subscribe();
    let session_id = executor
        .start_session("what is rust", vec![], nine_phase_config())
        .unwrap();
    executor.run_to_completion(session_id).await.unwrap();

    let mut live = Vec::new();
    loop {
        match live_rx.try_recv() {
            Ok(envelope) => live.push(envelope),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => panic!("live subscriber lagged"),
        }
    }

    let replay = executor.context().bus.history(session_id);
    assert!(!replay.is_empty());
    assert_eq!(replay.len(), live.len());
    for (replayed, lived) in replay.iter().zip(live.iter()) {
        assert_eq!(replayed.id, lived.id);
        assert_eq!(replayed.seq, lived.seq);
        assert_eq!(replayed.session_id, lived.session_id);
        assert_eq!(replayed.timestamp, lived.timestamp);
    }
}

#[tokio::test(start_paused = true)]
async fn language_model_failure_retries_then_fails_session() {
    let executor = executor_with(
        Arc::new(TimingOutModel),
        full_coordinator(false),
        ExecutorSettings::default()
            .with_max_retries(2)
            .with_retry_backoff(Duration::from_millis(10)),
    );

    let mut events_rx = executor.context().bus.subscribe();
    let config = PipelineConfig::chain(vec![PhaseDescriptor::new(
        "answer",
        1,
        ExecutorType::LanguageModel,
    )]);
    let session_id = executor.start_session("q", vec![], config).unwrap();
    let state = executor.run_to_completion(session_id).await.unwrap();

    assert_eq!(state.status, SessionStatus::Failed);
    assert_eq!(state.phases_with_status(PhaseStatus::Failed), 1);

    let mut retry_events = 0usize;
    let mut terminal_error = None;
    while let Ok(envelope) = events_rx.try_recv() {
        match envelope.event {
            Event::PhaseFailed { will_retry, .. } => {
                if will_retry {
                    retry_events += 1;
                }
            }
            Event::SessionFailed { error } => terminal_error = Some(error),
            _ => {}
        }
    }
    assert_eq!(retry_events, 2);
    assert!(terminal_error.expect("terminal event").contains("timed out"));
}

#[tokio::test]
async fn invalid_configs_are_rejected_at_start() {
    let executor = executor_with(
        Arc::new(ScriptedModel::new("answer")),
        full_coordinator(false),
        ExecutorSettings::default(),
    );

    let cyclic = PipelineConfig::new(vec![
        PhaseDescriptor::new("a", 1, ExecutorType::LanguageModel).with_next("b"),
        PhaseDescriptor::new("b", 2, ExecutorType::LanguageModel).with_next("a"),
    ]);
    let error = executor.start_session("q", vec![], cyclic).unwrap_err();
    assert!(error.is_config_error());

    let dangling = PipelineConfig::new(vec![PhaseDescriptor::new(
        "a",
        1,
        ExecutorType::LanguageModel,
    )
    .with_next("ghost")]);
    let error = executor.start_session("q", vec![], dangling).unwrap_err();
    assert!(error.is_config_error());
}

#[tokio::test]
async fn cancelled_session_aborts_without_running_further_phases() {
    let executor = executor_with(
        Arc::new(ScriptedModel::new("answer")),
        full_coordinator(false),
        ExecutorSettings::default(),
    );

    let session_id = executor
        .start_session("q", vec![], nine_phase_config())
        .unwrap();

    executor.cancel(session_id).unwrap();
    let outcome = executor.advance(session_id).await.unwrap();
    assert_eq!(
        outcome,
        pipeline::AdvanceOutcome::Terminal(SessionStatus::Aborted)
    );

    let state = executor.get_state(session_id).await.unwrap();
    assert_eq!(state.status, SessionStatus::Aborted);
    assert!(state.phase_history.is_empty());

    let history = executor.context().bus.history(session_id);
    assert!(matches!(
        history.last().unwrap().event,
        Event::SessionAborted
    ));
}

#[tokio::test]
async fn submit_streams_replay_and_live_events() {
    let executor = executor_with(
        Arc::new(ScriptedModel::new("answer")),
        full_coordinator(false),
        ExecutorSettings::default(),
    );

    let config = PipelineConfig::chain(vec![PhaseDescriptor::new(
        "answer",
        1,
        ExecutorType::LanguageModel,
    )]);
    let receipt = executor
        .submit(SubmitQuery::new("what is rust"), config)
        .unwrap();
    let mut stream = receipt.stream.expect("streaming enabled");

    let mut seen = stream.replay.clone();
    let deadline = Duration::from_secs(5);
    loop {
        if seen
            .last()
            .map(|envelope| envelope.event.is_terminal())
            .unwrap_or(false)
        {
            break;
        }
        let envelope = tokio::time::timeout(deadline, stream.live.recv())
            .await
            .expect("stream did not terminate")
            .expect("bus closed");
        if envelope.session_id == receipt.session_id {
            seen.push(envelope);
        }
    }

    // Sequence numbers are contiguous from the start: replay plus live
    // delivery covered every event exactly once.
    for (index, envelope) in seen.iter().enumerate() {
        assert_eq!(envelope.seq, index as u64);
    }
    assert!(matches!(
        seen.first().unwrap().event,
        Event::SessionStarted { .. }
    ));
}

#[tokio::test]
async fn terminal_sessions_are_archived_after_retention() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("archive.db").display());
    let pool = db::create_pool(&url).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let repository = db::SessionArchiveRepository::new(pool);

    let ctx = PipelineContext::new(
        Arc::new(ScriptedModel::new("archived answer")),
        retrieval_engine(),
        full_coordinator(false),
    )
    .with_archive(repository.clone())
    .with_settings(ExecutorSettings::default().with_retention(chrono::Duration::zero()));
    let executor = Arc::new(PhaseGraphExecutor::new(Arc::new(ctx)));

    let config = PipelineConfig::chain(vec![PhaseDescriptor::new(
        "answer",
        1,
        ExecutorType::LanguageModel,
    )]);
    let session_id = executor.start_session("q", vec![], config).unwrap();
    executor.run_to_completion(session_id).await.unwrap();

    // Zero retention: the session expires as soon as its completion
    // timestamp is in the past.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let retired = executor.retire_expired().await.unwrap();
    assert_eq!(retired, 1);

    // Evicted from memory, present in the archive, log purged.
    assert!(executor.get_state(session_id).await.is_err());
    let archived = repository.find_by_id(session_id).await.unwrap().unwrap();
    assert_eq!(archived.status, SessionStatus::Completed);
    assert_eq!(archived.answer.as_deref(), Some("archived answer"));
    assert!(executor.context().bus.history(session_id).is_empty());
}
