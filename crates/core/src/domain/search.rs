use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The three federated store kinds the retrieval engine fuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Vector,
    Keyword,
    Graph,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
            Self::Graph => "graph",
        }
    }

    pub fn all() -> [BackendKind; 3] {
        [Self::Vector, Self::Keyword, Self::Graph]
    }
}

/// Per-backend normalized scores for one fused candidate. A `None` component
/// means that backend did not return the document at all, which is distinct
/// from scoring it zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct BackendScores {
    pub vector: Option<f64>,
    pub keyword: Option<f64>,
    pub graph: Option<f64>,
}

impl BackendScores {
    pub fn get(&self, kind: BackendKind) -> Option<f64> {
        match kind {
            BackendKind::Vector => self.vector,
            BackendKind::Keyword => self.keyword,
            BackendKind::Graph => self.graph,
        }
    }

    pub fn set(&mut self, kind: BackendKind, score: f64) {
        match kind {
            BackendKind::Vector => self.vector = Some(score),
            BackendKind::Keyword => self.keyword = Some(score),
            BackendKind::Graph => self.graph = Some(score),
        }
    }
}

/// Relative weight of each backend in fusion. Weights need not sum to one;
/// they are renormalized per document over the backends that scored it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SearchWeights {
    pub vector: f64,
    pub keyword: f64,
    pub graph: f64,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            vector: 0.5,
            keyword: 0.3,
            graph: 0.2,
        }
    }
}

impl SearchWeights {
    pub fn get(&self, kind: BackendKind) -> f64 {
        match kind {
            BackendKind::Vector => self.vector,
            BackendKind::Keyword => self.keyword,
            BackendKind::Graph => self.graph,
        }
    }

    /// All weight on a single backend, reproducing its native ranking.
    pub fn only(kind: BackendKind) -> Self {
        let mut weights = Self {
            vector: 0.0,
            keyword: 0.0,
            graph: 0.0,
        };
        match kind {
            BackendKind::Vector => weights.vector = 1.0,
            BackendKind::Keyword => weights.keyword = 1.0,
            BackendKind::Graph => weights.graph = 1.0,
        }
        weights
    }
}

/// One fused candidate document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: String,
    pub content: String,
    pub scores: BackendScores,
    pub fused_score: f64,
    pub metadata: HashMap<String, String>,
}
