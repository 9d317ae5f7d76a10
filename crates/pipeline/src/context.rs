//! Explicit pipeline context: every collaborator a phase handler needs,
//! constructed once and passed by reference. No module-level globals.

use std::sync::Arc;
use std::time::Duration;

use agents::{SupervisorCoordinator, SynthesisPolicy};
use budget::BudgetAllocator;
use db::SessionArchiveRepository;
use events::EventBus;
use quorum_core::LanguageModel;
use retrieval::HybridRetrievalEngine;

/// Runtime tunables for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Retry limit for language-model phase attempts.
    pub max_retries: u32,
    /// Base delay of the exponential backoff between retries.
    pub retry_backoff: Duration,
    /// Gate for conditional supervisor phases.
    pub supervisor_enabled: bool,
    /// How many fused documents to retrieve per session.
    pub top_k: usize,
    /// Base token grant fed to the budget allocator.
    pub base_tokens: u32,
    /// How long terminal sessions stay in memory before archival.
    pub retention: chrono::Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            supervisor_enabled: true,
            top_k: 8,
            base_tokens: 4_000,
            retention: chrono::Duration::minutes(30),
        }
    }
}

impl ExecutorSettings {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_supervisor_enabled(mut self, enabled: bool) -> Self {
        self.supervisor_enabled = enabled;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_retention(mut self, retention: chrono::Duration) -> Self {
        self.retention = retention;
        self
    }
}

/// Shared dependencies for all sessions. Cheap to clone via `Arc`; backend
/// handles inside are shared read-only across sessions.
pub struct PipelineContext {
    pub language_model: Arc<dyn LanguageModel>,
    pub retrieval: Arc<HybridRetrievalEngine>,
    pub coordinator: Arc<SupervisorCoordinator>,
    pub allocator: BudgetAllocator,
    pub synthesis_policy: SynthesisPolicy,
    pub bus: EventBus,
    pub archive: Option<SessionArchiveRepository>,
    pub settings: ExecutorSettings,
}

impl PipelineContext {
    pub fn new(
        language_model: Arc<dyn LanguageModel>,
        retrieval: Arc<HybridRetrievalEngine>,
        coordinator: Arc<SupervisorCoordinator>,
    ) -> Self {
        Self {
            language_model,
            retrieval,
            coordinator,
            allocator: BudgetAllocator::default(),
            synthesis_policy: SynthesisPolicy::default(),
            bus: EventBus::new(),
            archive: None,
            settings: ExecutorSettings::default(),
        }
    }

    pub fn with_allocator(mut self, allocator: BudgetAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_synthesis_policy(mut self, policy: SynthesisPolicy) -> Self {
        self.synthesis_policy = policy;
        self
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_archive(mut self, archive: SessionArchiveRepository) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }
}
