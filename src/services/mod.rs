pub mod dashboard;
pub mod group_progress;
pub mod quiz;
pub mod words;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid scope: {0}")]
    InvalidScope(String),
    #[error("{0}")]
    Validation(String),
    #[error("session already completed: {0}")]
    SessionClosed(String),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl QuizError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
