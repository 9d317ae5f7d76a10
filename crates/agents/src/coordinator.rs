//! Concurrent agent execution with per-agent timeouts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use quorum_core::{AgentResult, AgentTask, AgentType};

use crate::error::AgentError;

const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// A specialized domain agent. Business logic lives outside this crate;
/// the coordinator only relies on this contract.
#[async_trait]
pub trait DomainAgent: Send + Sync {
    fn kind(&self) -> AgentType;

    async fn run(&self, task: AgentTask) -> Result<AgentResult, AgentError>;
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub agent_timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }
}

/// Runs selected agents concurrently and collects one `AgentResult` per
/// agent, no matter what: timeouts, errors, and missing registrations all
/// become flagged simulated results rather than failures.
pub struct SupervisorCoordinator {
    registry: HashMap<AgentType, Arc<dyn DomainAgent>>,
    config: CoordinatorConfig,
    limiter: Arc<Semaphore>,
}

impl SupervisorCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            registry: HashMap::new(),
            config,
            limiter,
        }
    }

    pub fn with_agent(mut self, agent: Arc<dyn DomainAgent>) -> Self {
        self.registry.insert(agent.kind(), agent);
        self
    }

    pub fn registered_agents(&self) -> Vec<AgentType> {
        let mut kinds: Vec<AgentType> = self.registry.keys().copied().collect();
        kinds.sort_by_key(|kind| kind.as_str());
        kinds
    }

    /// Fan out to the selected agents and wait for all of them or their
    /// individual timeouts, whichever comes first per agent.
    pub async fn execute_agents(
        &self,
        selected: &[AgentType],
        task_for: impl Fn(AgentType) -> AgentTask,
    ) -> HashMap<AgentType, AgentResult> {
        let timeout = self.config.agent_timeout;

        let runs = selected.iter().map(|&kind| {
            let agent = self.registry.get(&kind).cloned();
            let task = task_for(kind);
            let limiter = Arc::clone(&self.limiter);
            async move {
                let Some(agent) = agent else {
                    warn!(agent = kind.as_str(), "agent not registered");
                    return (kind, AgentResult::simulated(kind, "not registered"));
                };

                let _permit = limiter.acquire().await.expect("semaphore never closed");
                let started = std::time::Instant::now();
                let result = match tokio::time::timeout(timeout, agent.run(task)).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(error)) => {
                        warn!(agent = kind.as_str(), error = %error, "agent failed");
                        AgentResult::simulated(kind, format!("error: {}", error))
                    }
                    Err(_) => {
                        warn!(
                            agent = kind.as_str(),
                            timeout_ms = timeout.as_millis() as u64,
                            "agent timed out"
                        );
                        AgentResult::simulated(kind, "timeout")
                    }
                };

                info!(
                    agent = kind.as_str(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    simulated = result.is_simulation,
                    "agent finished"
                );
                (kind, result)
            }
        });

        join_all(runs).await.into_iter().collect()
    }
}
