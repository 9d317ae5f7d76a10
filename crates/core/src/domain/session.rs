use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Running,
    Completed,
    Failed,
    Aborted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior exchange in the conversation leading up to the current query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// One end-to-end processing of a single user query through the phase graph.
///
/// Owned exclusively by the phase graph executor; other components only ever
/// see immutable snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySession {
    pub id: Uuid,
    pub query_text: String,
    pub conversation_history: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
    /// Phase id currently running, `None` before the first phase starts
    /// and after the session reaches a terminal status.
    pub current_phase: Option<String>,
    pub status: SessionStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuerySession {
    pub fn new(query_text: impl Into<String>, conversation_history: Vec<ConversationTurn>) -> Self {
        Self {
            id: Uuid::new_v4(),
            query_text: query_text.into(),
            conversation_history,
            created_at: Utc::now(),
            current_phase: None,
            status: SessionStatus::Running,
            completed_at: None,
        }
    }

    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.current_phase = None;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self) {
        self.status = SessionStatus::Failed;
        self.current_phase = None;
        self.completed_at = Some(Utc::now());
    }

    pub fn abort(&mut self) {
        self.status = SessionStatus::Aborted;
        self.current_phase = None;
        self.completed_at = Some(Utc::now());
    }
}
