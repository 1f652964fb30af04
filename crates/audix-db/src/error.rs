//! Database error types for audix-db.

use audix_core::errors::{CoreError, ErrorKind};
use thiserror::Error;

/// Errors from database and service operations.
///
/// Domain outcomes travel as [`DatabaseError::Core`]; every other variant is a
/// storage failure. Use [`DatabaseError::kind`] to classify.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Validation, not-found, conflict or dependency-cycle outcome.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A SQL query failed or returned malformed data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Stored data contradicts an invariant, or a local path cannot be prepared.
    /// Classified as storage but never retryable.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Blob store read or write failed.
    #[error("Blob store error: {0}")]
    Blob(#[from] object_store::Error),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(err) => err.kind(),
            _ => ErrorKind::Storage,
        }
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidState(_) => false,
            _ => self.kind().is_retryable(),
        }
    }

    pub fn not_found(entity_type: impl std::fmt::Display, id: impl Into<String>) -> Self {
        Self::Core(CoreError::not_found(entity_type, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Core(CoreError::validation(message))
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Query(format!("JSON column: {err}"))
    }
}
