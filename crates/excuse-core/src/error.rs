//! Error types for the excuse service

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExcuseError>;

#[derive(Error, Debug)]
pub enum ExcuseError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Excuse not found: {0}")]
    NotFound(String),

    #[error("Duplicate excuse id: {0}")]
    DuplicateId(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ExcuseError {
    /// Failures of the storage machinery itself, as opposed to problems
    /// with the caller's request.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            ExcuseError::Database(_) | ExcuseError::Io(_) | ExcuseError::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for ExcuseError {
    fn from(e: serde_json::Error) -> Self {
        ExcuseError::Serialization(e.to_string())
    }
}
