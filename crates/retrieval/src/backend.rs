use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use quorum_core::BackendKind;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend query failed: {0}")]
    QueryFailed(String),

    #[error("Backend query timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// One candidate in a backend's native ranking. Scores are in the backend's
/// own scale; the engine normalizes before fusion.
#[derive(Debug, Clone)]
pub struct BackendHit {
    pub document_id: String,
    pub content: String,
    pub score: f64,
    pub metadata: HashMap<String, String>,
}

impl BackendHit {
    pub fn new(document_id: impl Into<String>, score: f64) -> Self {
        Self {
            document_id: document_id.into(),
            content: String::new(),
            score,
            metadata: HashMap::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Capability interface one store kind exposes to the engine.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Return up to `top_k` candidates for the query, best first, in the
    /// backend's native score scale.
    async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<BackendHit>, BackendError>;
}

enum BackendState {
    Ready(Arc<dyn SearchBackend>),
    /// Decided once at construction; never re-probed at call sites.
    Unavailable { reason: String },
}

/// A configured backend plus its degradation bookkeeping. The warn flag
/// makes exactly-once emission of the degradation warning testable.
pub struct BackendSlot {
    kind: BackendKind,
    state: BackendState,
    degradation_warned: AtomicBool,
}

impl BackendSlot {
    pub fn ready(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            kind: backend.kind(),
            state: BackendState::Ready(backend),
            degradation_warned: AtomicBool::new(false),
        }
    }

    pub fn unavailable(kind: BackendKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            state: BackendState::Unavailable {
                reason: reason.into(),
            },
            degradation_warned: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, BackendState::Ready(_))
    }

    pub fn backend(&self) -> Option<&Arc<dyn SearchBackend>> {
        match &self.state {
            BackendState::Ready(backend) => Some(backend),
            BackendState::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            BackendState::Ready(_) => None,
            BackendState::Unavailable { reason } => Some(reason),
        }
    }

    /// Emit the degradation warning for this backend at most once per
    /// process lifetime.
    pub fn warn_degraded(&self, detail: &str) {
        if !self.degradation_warned.swap(true, Ordering::Relaxed) {
            warn!(
                backend = self.kind.as_str(),
                detail, "retrieval backend degraded"
            );
        }
    }

    pub fn has_warned(&self) -> bool {
        self.degradation_warned.load(Ordering::Relaxed)
    }
}
