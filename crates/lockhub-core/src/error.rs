//! Core error type shared across the workspace.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error taxonomy.
///
/// Domain crates define their own richer error enums and convert into this
/// type at the boundaries that need a single shape (the HTTP layer maps each
/// variant to a status code).
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input, rejected before any state mutation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation illegal in the entity's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistent store failure; the caller should retry the whole request.
    #[error("storage error: {0}")]
    Storage(String),

    /// Unexpected internal fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller can expect a retry of the identical request to
    /// eventually succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Storage("pool closed".into()).is_retryable());
        assert!(!Error::Validation("bad".into()).is_retryable());
        assert!(!Error::Conflict("cancelled".into()).is_retryable());
    }
}
