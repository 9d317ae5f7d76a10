use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Phase not found: {0}")]
    PhaseNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
