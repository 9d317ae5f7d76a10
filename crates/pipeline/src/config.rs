//! Phase graph configuration, deserialized from JSON and validated once at
//! load.

use quorum_core::ExecutorType;
use serde::{Deserialize, Serialize};

/// How eagerly intermediate outputs are streamed to subscribers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Emit intermediate phase outputs as `answer.partial` events.
    #[default]
    Streaming,
    /// Lifecycle events only; the answer arrives with the terminal event.
    Buffered,
}

/// One configured pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDescriptor {
    pub phase_id: String,
    pub phase_number: u32,
    pub executor_type: ExecutorType,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub next_phase_ids: Vec<String>,
}

impl PhaseDescriptor {
    pub fn new(
        phase_id: impl Into<String>,
        phase_number: u32,
        executor_type: ExecutorType,
    ) -> Self {
        Self {
            phase_id: phase_id.into(),
            phase_number,
            executor_type,
            priority: 0,
            next_phase_ids: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next_phase_ids.push(next.into());
        self
    }
}

/// Ordered phase descriptors plus graph-level settings. Referential
/// integrity and acyclicity are enforced by [`crate::graph::PhaseGraph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub phases: Vec<PhaseDescriptor>,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    #[serde(default)]
    pub conditional_phase_ids: Vec<String>,
}

impl PipelineConfig {
    pub fn new(phases: Vec<PhaseDescriptor>) -> Self {
        Self {
            phases,
            execution_mode: ExecutionMode::default(),
            conditional_phase_ids: Vec::new(),
        }
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_conditional(mut self, phase_id: impl Into<String>) -> Self {
        self.conditional_phase_ids.push(phase_id.into());
        self
    }

    /// A single linear chain of phases, in the given order.
    pub fn chain(descriptors: Vec<PhaseDescriptor>) -> Self {
        let mut phases = descriptors;
        let next_ids: Vec<Option<String>> = phases
            .iter()
            .skip(1)
            .map(|d| Some(d.phase_id.clone()))
            .chain(std::iter::once(None))
            .collect();
        for (phase, next) in phases.iter_mut().zip(next_ids) {
            phase.next_phase_ids = next.into_iter().collect();
        }
        Self::new(phases)
    }
}
