use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::policy::{BudgetPolicy, IntentType};

/// Full breakdown of one allocation. Callers always get the intermediate
/// factors, not just the total, so allocation decisions are auditable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenBudget {
    pub base_tokens: u32,
    pub complexity_score: f64,
    pub complexity_factor: f64,
    pub chunk_count: u32,
    pub chunk_bonus: u32,
    pub source_diversity: u32,
    pub source_diversity_factor: f64,
    pub agent_count: u32,
    pub agent_factor: f64,
    pub intent: IntentType,
    pub intent_weight: f64,
    pub final_budget: u32,
}

/// Deterministic budget computation over a fixed policy.
#[derive(Debug, Clone, Default)]
pub struct BudgetAllocator {
    policy: BudgetPolicy,
}

impl BudgetAllocator {
    pub fn new(policy: BudgetPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BudgetPolicy {
        &self.policy
    }

    /// Compute the budget for one answer-generation call.
    ///
    /// Monotonic non-decreasing in every input holding the others fixed, and
    /// always clamped to `[floor, hard_cap]`.
    pub fn allocate(
        &self,
        base_tokens: u32,
        complexity_score: f64,
        chunk_count: u32,
        source_diversity: u32,
        agent_count: u32,
        intent: IntentType,
    ) -> TokenBudget {
        let complexity_factor = self.policy.complexity_factor(complexity_score);
        let chunk_bonus = self.policy.chunk_bonus(chunk_count);
        let source_diversity_factor = self.policy.source_diversity_factor(source_diversity);
        let agent_factor = self.policy.agent_factor(agent_count);
        let intent_weight = self.policy.intent_weight(intent);

        let core = base_tokens as f64 * complexity_factor + chunk_bonus as f64;
        let scaled = core * source_diversity_factor * agent_factor * intent_weight;
        let final_budget = (scaled.round() as u64)
            .clamp(self.policy.floor as u64, self.policy.hard_cap as u64) as u32;

        debug!(
            base_tokens,
            complexity_factor, chunk_bonus, final_budget, "budget allocated"
        );

        TokenBudget {
            base_tokens,
            complexity_score,
            complexity_factor,
            chunk_count,
            chunk_bonus,
            source_diversity,
            source_diversity_factor,
            agent_count,
            agent_factor,
            intent,
            intent_weight,
            final_budget,
        }
    }
}
