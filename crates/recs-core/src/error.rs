//! Error types for recs.

use thiserror::Error;

use crate::models::EntityKind;

/// Result type alias using recs' Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for recs operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entity row not found for the given kind and id
    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: EntityKind, id: i64 },

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Task scheduling error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether another attempt could succeed.
    ///
    /// Invalid input fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::InvalidInput(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
