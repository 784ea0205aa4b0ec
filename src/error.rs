//! Error types for lease operations.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// The entity exists but belongs to another user.
    #[error("{entity} {id} is not owned by the caller")]
    Forbidden { entity: &'static str, id: Uuid },

    #[error("validation failed: {0}")]
    Validation(String),

    /// Active-lease exclusivity or a duplicate membership.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LeaseError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type LeaseResult<T> = Result<T, LeaseError>;
