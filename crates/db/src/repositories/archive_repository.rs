use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{ArchivedSession, ArchivedSessionRow};

#[derive(Clone)]
pub struct SessionArchiveRepository {
    pool: SqlitePool,
}

impl SessionArchiveRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn archive(&self, session: &ArchivedSession) -> Result<(), DbError> {
        let row = ArchivedSessionRow::from(session);

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO archived_sessions
                (id, query_text, status, phase_history, answer, confidence,
                 created_at, completed_at, archived_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.query_text)
        .bind(&row.status)
        .bind(&row.phase_history)
        .bind(&row.answer)
        .bind(row.confidence)
        .bind(row.created_at)
        .bind(row.completed_at)
        .bind(row.archived_at)
        .execute(&self.pool)
        .await?;

        debug!(session_id = %session.id, "session archived");
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ArchivedSession>, DbError> {
        let row: Option<ArchivedSessionRow> = sqlx::query_as(
            r#"
            SELECT id, query_text, status, phase_history, answer, confidence,
                   created_at, completed_at, archived_at
            FROM archived_sessions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }

    /// Delete archive entries older than the cutoff. Returns the number of
    /// rows removed.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM archived_sessions WHERE archived_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM archived_sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_pool, run_migrations};
    use chrono::Duration;
    use quorum_core::SessionStatus;

    async fn test_repo() -> (SessionArchiveRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("archive.db").display());
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        (SessionArchiveRepository::new(pool), dir)
    }

    fn archived(status: SessionStatus, archived_at: DateTime<Utc>) -> ArchivedSession {
        ArchivedSession {
            id: Uuid::new_v4(),
            query_text: "q".to_string(),
            status,
            phase_history: vec![],
            answer: None,
            confidence: None,
            created_at: archived_at - Duration::minutes(5),
            completed_at: Some(archived_at),
            archived_at,
        }
    }

    #[tokio::test]
    async fn test_archive_and_find() {
        let (repo, _dir) = test_repo().await;
        let session = archived(SessionStatus::Completed, Utc::now());

        repo.archive(&session).await.unwrap();
        let found = repo.find_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let (repo, _dir) = test_repo().await;
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_respects_cutoff() {
        let (repo, _dir) = test_repo().await;
        let old = archived(SessionStatus::Failed, Utc::now() - Duration::days(30));
        let recent = archived(SessionStatus::Completed, Utc::now());

        repo.archive(&old).await.unwrap();
        repo.archive(&recent).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);

        let purged = repo
            .purge_older_than(Utc::now() - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(repo.find_by_id(old.id).await.unwrap().is_none());
        assert!(repo.find_by_id(recent.id).await.unwrap().is_some());
    }
}
