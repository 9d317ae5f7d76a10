//! The federated search engine: concurrent per-backend queries, fusion,
//! post-filtering.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use quorum_core::{BackendKind, SearchResult, SearchWeights};

use crate::backend::{BackendError, BackendSlot, SearchBackend};
use crate::fusion::{fuse, normalize_scores, RankedList};

const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query_text: String,
    pub top_k: usize,
    pub weights: SearchWeights,
    /// Exact-match metadata post-filter, applied after fusion.
    pub filters: HashMap<String, String>,
}

impl SearchRequest {
    pub fn new(query_text: impl Into<String>, top_k: usize) -> Self {
        Self {
            query_text: query_text.into(),
            top_k,
            weights: SearchWeights::default(),
            filters: HashMap::new(),
        }
    }

    pub fn with_weights(mut self, weights: SearchWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

/// Outcome of one federated search. Degradation is reported, never raised:
/// `success == false` only when every backend was out of play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<SearchResult>,
    /// Backends that could not contribute to this call.
    pub degraded_backends: Vec<BackendKind>,
    pub reason: Option<String>,
}

/// Federates search across the configured store backends and fuses their
/// rankings. Backend handles are shared read-only across sessions.
pub struct HybridRetrievalEngine {
    slots: Vec<BackendSlot>,
    backend_timeout: Duration,
}

impl HybridRetrievalEngine {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.slots.push(BackendSlot::ready(backend));
        self
    }

    /// Register a backend kind that was found unusable at construction time
    /// (missing endpoint, failed handshake). It is never re-probed.
    pub fn with_unavailable(mut self, kind: BackendKind, reason: impl Into<String>) -> Self {
        self.slots.push(BackendSlot::unavailable(kind, reason));
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn slots(&self) -> &[BackendSlot] {
        &self.slots
    }

    /// Query every weighted, available backend concurrently and fuse the
    /// results. Unavailable or failing backends degrade their contribution
    /// without failing the call; only an empty field of backends yields
    /// `success == false`.
    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        let queried: Vec<&BackendSlot> = self
            .slots
            .iter()
            .filter(|slot| request.weights.get(slot.kind()) > 0.0)
            .collect();

        let mut degraded: Vec<BackendKind> = Vec::new();
        let mut futures = Vec::new();
        let mut active: Vec<&BackendSlot> = Vec::new();

        for slot in queried.iter().copied() {
            match slot.backend() {
                Some(backend) => {
                    let backend = Arc::clone(backend);
                    let query = request.query_text.clone();
                    let top_k = request.top_k;
                    let timeout = self.backend_timeout;
                    active.push(slot);
                    futures.push(async move {
                        match tokio::time::timeout(timeout, backend.query(&query, top_k)).await {
                            Ok(result) => result,
                            Err(_) => Err(BackendError::Timeout {
                                timeout_ms: timeout.as_millis() as u64,
                            }),
                        }
                    });
                }
                None => {
                    slot.warn_degraded(slot.unavailable_reason().unwrap_or("unavailable"));
                    degraded.push(slot.kind());
                }
            }
        }

        let outcomes = join_all(futures).await;

        let mut lists: Vec<RankedList> = Vec::new();
        for (slot, outcome) in active.iter().zip(outcomes) {
            match outcome {
                Ok(mut hits) => {
                    normalize_scores(&mut hits);
                    lists.push(RankedList {
                        kind: slot.kind(),
                        hits,
                    });
                }
                Err(error) => {
                    slot.warn_degraded(&error.to_string());
                    degraded.push(slot.kind());
                }
            }
        }

        if lists.is_empty() {
            let reason = if queried.is_empty() {
                "no backend carries a positive weight".to_string()
            } else {
                "all weighted backends unavailable".to_string()
            };
            info!(reason = %reason, "federated search returned nothing");
            return SearchResponse {
                success: false,
                results: Vec::new(),
                degraded_backends: degraded,
                reason: Some(reason),
            };
        }

        let mut results = fuse(&lists, &request.weights);
        if !request.filters.is_empty() {
            results.retain(|result| {
                request
                    .filters
                    .iter()
                    .all(|(key, value)| result.metadata.get(key) == Some(value))
            });
        }
        results.truncate(request.top_k);

        debug!(
            results = results.len(),
            degraded = degraded.len(),
            "federated search fused"
        );

        SearchResponse {
            success: true,
            results,
            degraded_backends: degraded,
            reason: None,
        }
    }
}

impl Default for HybridRetrievalEngine {
    fn default() -> Self {
        Self::new()
    }
}
