//! Error taxonomy shared by every audix crate.
//!
//! `CoreError` carries the five outcome kinds a caller must distinguish.
//! Storage-specific failures live in `audix-db` and are classified into
//! [`ErrorKind::Storage`] there.

use std::fmt;

use thiserror::Error;

/// Domain errors raised by pure core logic and by the service layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input or a rule violation (unmet dependency, dangling reference).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// Optimistic concurrency mismatch on a version or revision counter.
    #[error("Conflict on {entity_type} {id}: expected version {expected}, found {actual}")]
    Conflict {
        entity_type: String,
        id: String,
        expected: u32,
        actual: u32,
    },

    /// Adding the edge `item_id -> depends_on_id` would close a cycle.
    #[error("Dependency cycle: {item_id} cannot depend on {depends_on_id}")]
    DependencyCycle {
        item_id: String,
        depends_on_id: String,
    },

    /// Persistence failure not otherwise classified.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    pub fn not_found(entity_type: impl fmt::Display, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classify into the caller-facing taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::DependencyCycle { .. } => ErrorKind::DependencyCycle,
            Self::Storage(_) | Self::Other(_) => ErrorKind::Storage,
        }
    }
}

/// The caller-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    DependencyCycle,
    Storage,
}

impl ErrorKind {
    /// Only storage failures may be retried without re-fetching state.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Storage)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::DependencyCycle => "dependency_cycle",
            Self::Storage => "storage_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
