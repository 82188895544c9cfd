use thiserror::Error;
use uuid::Uuid;

/// Failures of story lifecycle operations.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("invalid media reference: {0}")]
    Validation(String),

    #[error("story {0} not found")]
    NotFound(Uuid),

    #[error("story {0} belongs to another user")]
    Permission(Uuid),

    /// Another request holds the row; the caller may retry.
    #[error("story {0} is being modified by another request, retry")]
    Conflict(Uuid),

    #[error("story storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("media store failure: {0}")]
    Media(anyhow::Error),
}
