//! Validated phase DAG.
//!
//! The loosely-linked descriptor list from [`crate::config`] is compiled
//! into a strongly-typed graph exactly once: duplicate ids, dangling
//! references, and cycles are load-time errors, never re-checked during
//! execution.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use quorum_core::PhaseStatus;

use crate::config::{ExecutionMode, PhaseDescriptor, PipelineConfig};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct PhaseGraph {
    phases: HashMap<String, PhaseDescriptor>,
    predecessors: HashMap<String, Vec<String>>,
    execution_mode: ExecutionMode,
    conditional: HashSet<String>,
}

impl PhaseGraph {
    /// Compile and validate a configuration.
    pub fn validate(config: PipelineConfig) -> Result<Self> {
        if config.phases.is_empty() {
            return Err(PipelineError::EmptyGraph);
        }

        let mut phases: HashMap<String, PhaseDescriptor> = HashMap::new();
        for descriptor in &config.phases {
            if phases
                .insert(descriptor.phase_id.clone(), descriptor.clone())
                .is_some()
            {
                return Err(PipelineError::DuplicatePhase {
                    phase_id: descriptor.phase_id.clone(),
                });
            }
        }

        let mut predecessors: HashMap<String, Vec<String>> = HashMap::new();
        for descriptor in &config.phases {
            for next in &descriptor.next_phase_ids {
                if !phases.contains_key(next) {
                    return Err(PipelineError::DanglingPhase {
                        from: descriptor.phase_id.clone(),
                        to: next.clone(),
                    });
                }
                predecessors
                    .entry(next.clone())
                    .or_default()
                    .push(descriptor.phase_id.clone());
            }
        }

        for conditional in &config.conditional_phase_ids {
            if !phases.contains_key(conditional) {
                return Err(PipelineError::DanglingPhase {
                    from: "conditional_phase_ids".to_string(),
                    to: conditional.clone(),
                });
            }
        }

        // Cycle detection over the compiled edge list.
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        for descriptor in &config.phases {
            let index = graph.add_node(descriptor.phase_id.as_str());
            nodes.insert(descriptor.phase_id.as_str(), index);
        }
        for descriptor in &config.phases {
            for next in &descriptor.next_phase_ids {
                graph.add_edge(
                    nodes[descriptor.phase_id.as_str()],
                    nodes[next.as_str()],
                    (),
                );
            }
        }
        if let Err(cycle) = toposort(&graph, None) {
            return Err(PipelineError::CyclicGraph {
                phase_id: graph[cycle.node_id()].to_string(),
            });
        }

        Ok(Self {
            phases,
            predecessors,
            execution_mode: config.execution_mode,
            conditional: config.conditional_phase_ids.into_iter().collect(),
        })
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    pub fn is_conditional(&self, phase_id: &str) -> bool {
        self.conditional.contains(phase_id)
    }

    pub fn phase(&self, phase_id: &str) -> Option<&PhaseDescriptor> {
        self.phases.get(phase_id)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// The next phase eligible to run: a phase that has not run yet, all of
    /// whose predecessors are terminal. Among eligible phases the highest
    /// priority wins; ties break by phase number, then id, keeping the walk
    /// deterministic for identical configs.
    pub fn next_eligible(
        &self,
        statuses: &HashMap<String, PhaseStatus>,
    ) -> Option<&PhaseDescriptor> {
        self.phases
            .values()
            .filter(|descriptor| !statuses.contains_key(&descriptor.phase_id))
            .filter(|descriptor| {
                self.predecessors
                    .get(&descriptor.phase_id)
                    .map(|preds| {
                        preds
                            .iter()
                            .all(|pred| statuses.get(pred).is_some_and(|s| s.is_terminal()))
                    })
                    .unwrap_or(true)
            })
            .min_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| a.phase_number.cmp(&b.phase_number))
                    .then_with(|| a.phase_id.cmp(&b.phase_id))
            })
    }
}
