use chrono::{DateTime, TimeZone, Utc};
use quorum_core::{PhaseRecord, SessionStatus};
use uuid::Uuid;

/// A terminal session as stored in the archive.
#[derive(Debug, Clone)]
pub struct ArchivedSession {
    pub id: Uuid,
    pub query_text: String,
    pub status: SessionStatus,
    pub phase_history: Vec<PhaseRecord>,
    pub answer: Option<String>,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub archived_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArchivedSessionRow {
    pub id: String,
    pub query_text: String,
    pub status: String,
    pub phase_history: String,
    pub answer: Option<String>,
    pub confidence: Option<f64>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub archived_at: i64,
}

impl ArchivedSessionRow {
    pub fn into_domain(self) -> ArchivedSession {
        ArchivedSession {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            query_text: self.query_text,
            status: SessionStatus::parse(&self.status).unwrap_or(SessionStatus::Failed),
            phase_history: serde_json::from_str(&self.phase_history).unwrap_or_default(),
            answer: self.answer,
            confidence: self.confidence,
            created_at: timestamp_to_datetime(self.created_at),
            completed_at: self.completed_at.map(timestamp_to_datetime),
            archived_at: timestamp_to_datetime(self.archived_at),
        }
    }
}

impl From<&ArchivedSession> for ArchivedSessionRow {
    fn from(session: &ArchivedSession) -> Self {
        Self {
            id: session.id.to_string(),
            query_text: session.query_text.clone(),
            status: session.status.as_str().to_string(),
            phase_history: serde_json::to_string(&session.phase_history)
                .unwrap_or_else(|_| "[]".to_string()),
            answer: session.answer.clone(),
            confidence: session.confidence,
            created_at: datetime_to_timestamp(session.created_at),
            completed_at: session.completed_at.map(datetime_to_timestamp),
            archived_at: datetime_to_timestamp(session.archived_at),
        }
    }
}

fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).unwrap()
}

fn datetime_to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}
