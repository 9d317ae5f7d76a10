//! Deterministic query complexity inference.
//!
//! Complexity is scored from three declared signals: query length, entity
//! density, and domain-citation density in the accumulated context. The
//! score is monotonic in each signal and carries no randomness, so identical
//! input always lands in the same category.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityCategory {
    Basic,
    Moderate,
    Complex,
}

impl ComplexityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }

    /// Position on the allocator's 0-10 complexity scale.
    pub fn score(&self) -> f64 {
        match self {
            Self::Basic => 2.0,
            Self::Moderate => 5.5,
            Self::Complex => 9.0,
        }
    }
}

/// Raw signals extracted from the query and context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexitySignals {
    /// Whitespace-separated token count of the query.
    pub query_tokens: usize,
    /// Capitalized terms, quoted phrases, and numerals per query token.
    pub entity_density: f64,
    /// Distinct cited sources in the accumulated context.
    pub citation_count: usize,
}

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\b[A-Z][a-zA-Z0-9_-]+\b|"[^"]+"|\b\d[\d.,]*\b"#).expect("valid regex")
    })
}

impl ComplexitySignals {
    pub fn extract(query_text: &str, citation_count: usize) -> Self {
        let query_tokens = query_text.split_whitespace().count();
        let entity_matches = entity_pattern().find_iter(query_text).count();
        let entity_density = if query_tokens == 0 {
            0.0
        } else {
            entity_matches as f64 / query_tokens as f64
        };
        Self {
            query_tokens,
            entity_density,
            citation_count,
        }
    }

    /// Combined score, monotonic non-decreasing in every signal.
    pub fn score(&self) -> f64 {
        let length_component = (self.query_tokens as f64 / 8.0).min(4.0);
        let entity_component = (self.entity_density * 6.0).min(3.0);
        let citation_component = (self.citation_count as f64 * 0.5).min(3.0);
        length_component + entity_component + citation_component
    }
}

/// Categorize a query. Thresholds are fixed policy; determinism and
/// monotonicity are the contract.
pub fn infer_complexity(query_text: &str, citation_count: usize) -> ComplexityCategory {
    let signals = ComplexitySignals::extract(query_text, citation_count);
    let score = signals.score();
    let category = if score < 2.0 {
        ComplexityCategory::Basic
    } else if score < 4.5 {
        ComplexityCategory::Moderate
    } else {
        ComplexityCategory::Complex
    };

    tracing::debug!(
        tokens = signals.query_tokens,
        entity_density = signals.entity_density,
        citations = signals.citation_count,
        score,
        category = category.as_str(),
        "complexity inferred"
    );
    category
}
