//! Storage error types and result alias.
//!
//! Every lookup backend (Mongo-backed services in production, the in-memory
//! store in tests) maps its internal failures onto [`StorageError`].
//!
//! # Absent versus failed
//!
//! The authorization tiers distinguish two families of errors:
//!
//! - [`StorageError::NotFound`] and [`StorageError::InvalidId`] mean "no such record". Callers
//!   treat them exactly like `Ok(None)`; see [`StorageError::is_absent`].
//! - Everything else is an infrastructure failure and must be surfaced to the operator.
//!
//! # Example
//!
//! ```
//! use registry_auth_storage::{StorageError, StorageResult};
//!
//! fn lookup(id: &str) -> StorageResult<Vec<u8>> {
//!     Err(StorageError::invalid_id(id))
//! }
//!
//! assert!(lookup("not-a-model").unwrap_err().is_absent());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for lookup operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading collaborator data.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; downstream match expressions
/// must include a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("Record not found: {key}")]
    NotFound {
        /// The identifier that was looked up.
        key: String,
    },

    /// The identifier is not well-formed for this record type.
    ///
    /// Registry scopes carry arbitrary repository names, so a malformed id is
    /// an expected input rather than a fault.
    #[error("Invalid identifier: {key}")]
    InvalidId {
        /// The malformed identifier.
        key: String,
    },

    /// Connection or network error.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Stored data could not be decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal backend error.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    #[error("Operation timeout")]
    Timeout,
}

impl StorageError {
    /// Creates a new `NotFound` error for the given key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a new `InvalidId` error for the given key.
    #[must_use]
    pub fn invalid_id(key: impl Into<String>) -> Self {
        Self::InvalidId { key: key.into() }
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Returns `true` when the error only says the record does not exist.
    ///
    /// Absent records fall through to the next authorization tier instead of
    /// failing the request.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidId { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::error::Error;

    use rstest::rstest;

    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(StorageError::not_found("model-1").to_string(), "Record not found: model-1");
        assert_eq!(StorageError::invalid_id("???").to_string(), "Invalid identifier: ???");
        assert_eq!(StorageError::timeout().to_string(), "Operation timeout");
        assert_eq!(
            StorageError::connection("refused").to_string(),
            "Connection error: refused"
        );
    }

    #[rstest]
    #[case::not_found(StorageError::not_found("x"), true)]
    #[case::invalid_id(StorageError::invalid_id("x"), true)]
    #[case::connection(StorageError::connection("down"), false)]
    #[case::serialization(StorageError::serialization("bad bson"), false)]
    #[case::internal(StorageError::internal("boom"), false)]
    #[case::timeout(StorageError::timeout(), false)]
    fn test_is_absent(#[case] err: StorageError, #[case] absent: bool) {
        assert_eq!(err.is_absent(), absent);
    }

    #[test]
    fn test_source_chain_preserved() {
        let err = StorageError::connection_with_source("mongo unreachable", StorageError::Timeout);
        let source = err.source().expect("source exists");
        assert_eq!(source.to_string(), "Operation timeout");
    }
}
