use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Archived session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Corrupt archive record for session {id}: {reason}")]
    CorruptRecord { id: Uuid, reason: String },
}
