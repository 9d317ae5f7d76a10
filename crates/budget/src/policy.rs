use serde::{Deserialize, Serialize};

/// Broad intent of the query, inferred upstream. Weights the budget toward
/// generative work and away from short factual lookups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Factual,
    Conversational,
    Analytical,
    Generative,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Factual => "factual",
            Self::Conversational => "conversational",
            Self::Analytical => "analytical",
            Self::Generative => "generative",
        }
    }
}

/// Tunable coefficients for the allocator. Defaults are the shipped policy;
/// deployments override via JSON config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetPolicy {
    /// Lower clamp for the final budget.
    pub floor: u32,
    /// Upper clamp for the final budget.
    pub hard_cap: u32,
    /// Complexity factor at score 0.
    pub complexity_factor_min: f64,
    /// Complexity factor at score 10.
    pub complexity_factor_max: f64,
    /// Tokens granted per retrieved chunk.
    pub tokens_per_chunk: u32,
    /// Chunks beyond this count stop adding bonus tokens.
    pub max_bonus_chunks: u32,
    /// Additional factor per distinct source kind.
    pub diversity_step: f64,
    /// Source kinds beyond this count stop increasing the factor.
    pub max_diversity_sources: u32,
    /// Additional factor per dispatched agent.
    pub agent_step: f64,
    /// Agents beyond this count stop increasing the factor.
    pub max_factored_agents: u32,
    pub intent_weight_factual: f64,
    pub intent_weight_conversational: f64,
    pub intent_weight_analytical: f64,
    pub intent_weight_generative: f64,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            floor: 1_000,
            hard_cap: 60_000,
            complexity_factor_min: 1.0,
            complexity_factor_max: 2.0,
            tokens_per_chunk: 180,
            max_bonus_chunks: 20,
            diversity_step: 0.05,
            max_diversity_sources: 6,
            agent_step: 0.10,
            max_factored_agents: 4,
            intent_weight_factual: 0.9,
            intent_weight_conversational: 1.0,
            intent_weight_analytical: 1.15,
            intent_weight_generative: 1.25,
        }
    }
}

impl BudgetPolicy {
    /// Linear interpolation between the min and max factor over the
    /// complexity score range [0, 10]. Out-of-range scores clamp.
    pub fn complexity_factor(&self, complexity_score: f64) -> f64 {
        let t = (complexity_score.clamp(0.0, 10.0)) / 10.0;
        self.complexity_factor_min + t * (self.complexity_factor_max - self.complexity_factor_min)
    }

    pub fn chunk_bonus(&self, chunk_count: u32) -> u32 {
        chunk_count.min(self.max_bonus_chunks) * self.tokens_per_chunk
    }

    pub fn source_diversity_factor(&self, source_diversity: u32) -> f64 {
        1.0 + self.diversity_step * source_diversity.min(self.max_diversity_sources) as f64
    }

    pub fn agent_factor(&self, agent_count: u32) -> f64 {
        1.0 + self.agent_step * agent_count.min(self.max_factored_agents) as f64
    }

    pub fn intent_weight(&self, intent: IntentType) -> f64 {
        match intent {
            IntentType::Factual => self.intent_weight_factual,
            IntentType::Conversational => self.intent_weight_conversational,
            IntentType::Analytical => self.intent_weight_analytical,
            IntentType::Generative => self.intent_weight_generative,
        }
    }
}
