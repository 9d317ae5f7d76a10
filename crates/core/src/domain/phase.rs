use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of handler runs a configured phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorType {
    LanguageModel,
    Supervisor,
    AgentCoordinator,
}

impl ExecutorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LanguageModel => "language_model",
            Self::Supervisor => "supervisor",
            Self::AgentCoordinator => "agent_coordinator",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Skipped,
    Failed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Failed)
    }
}

/// Execution record of a single phase instance within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase_id: String,
    pub status: PhaseStatus,
    pub inputs: serde_json::Value,
    pub outputs: serde_json::Value,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PhaseRecord {
    pub fn pending(phase_id: impl Into<String>) -> Self {
        Self {
            phase_id: phase_id.into(),
            status: PhaseStatus::Pending,
            inputs: serde_json::Value::Null,
            outputs: serde_json::Value::Null,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self, inputs: serde_json::Value) {
        self.status = PhaseStatus::Running;
        self.inputs = inputs;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self, outputs: serde_json::Value) {
        self.status = PhaseStatus::Completed;
        self.outputs = outputs;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the phase skipped, substituting a neutral output so downstream
    /// phases never observe missing inputs.
    pub fn skip(&mut self, neutral_output: serde_json::Value) {
        self.status = PhaseStatus::Skipped;
        self.outputs = neutral_output;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = PhaseStatus::Failed;
        self.outputs = serde_json::json!({ "error": error.into() });
        self.completed_at = Some(Utc::now());
    }
}
