//! Unified error types for Thicket.
//!
//! Storage and index-library failures keep their original error as the
//! `source` so callers can inspect them and apply their own retry policy.
//! Conditions that are part of normal control flow (deleting an absent
//! document, an empty query) are not represented here.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Thicket operations.
#[derive(Error, Debug)]
pub enum ThicketError {
    /// I/O errors while loading or persisting the index blob.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Errors reported by the underlying inverted index.
    #[error("index error: {context}: {source}")]
    Index {
        context: String,
        #[source]
        source: tantivy::TantivyError,
    },

    /// The query could not be parsed by the index.
    #[error("query error: {message}")]
    Query { message: String },

    /// JSON encoding/decoding errors (index blob, document input).
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// A document violated the input contract (e.g. missing id).
    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// The stored index changed since it was loaded.
    #[error("index generation conflict: loaded {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },
}

/// A specialized Result type for Thicket operations.
pub type Result<T> = std::result::Result<T, ThicketError>;

impl ThicketError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create an index error, keeping the tantivy error as source.
    pub fn index(context: impl Into<String>, source: tantivy::TantivyError) -> Self {
        Self::Index {
            context: context.into(),
            source,
        }
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the caller may reasonably retry the operation.
    ///
    /// Storage failures and generation conflicts are transient from the
    /// engine's point of view; everything else needs different input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Conflict { .. })
    }
}

impl From<io::Error> for ThicketError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for ThicketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Exit codes for the Thicket CLI.
pub mod exit_codes {
    /// The command completed.
    pub const SUCCESS: i32 = 0;

    /// The command failed; details were printed.
    pub const FAILURE: i32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_storage_error_display() {
        let err = ThicketError::storage(
            "/tmp/index.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/index.json"));
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let err = ThicketError::storage(
            "/tmp/index.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let source = err.source().unwrap();
        let io_err = source.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_index_error_display() {
        let err = ThicketError::index(
            "failed to commit",
            tantivy::TantivyError::InvalidArgument("bad".to_string()),
        );
        assert!(err.to_string().starts_with("index error: failed to commit"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_query_error_display() {
        let err = ThicketError::query("unbalanced parenthesis");
        assert_eq!(err.to_string(), "query error: unbalanced parenthesis");
    }

    #[test]
    fn test_invalid_document_display() {
        let err = ThicketError::invalid_document("id must not be empty");
        assert_eq!(err.to_string(), "invalid document: id must not be empty");
    }

    #[test]
    fn test_conflict_display() {
        let err = ThicketError::Conflict {
            expected: 3,
            found: 4,
        };
        assert_eq!(
            err.to_string(),
            "index generation conflict: loaded 3, found 4"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(ThicketError::from(io::Error::other("disk full")).is_retryable());
        assert!(ThicketError::Conflict {
            expected: 1,
            found: 2
        }
        .is_retryable());
        assert!(!ThicketError::invalid_document("x").is_retryable());
        assert!(!ThicketError::config("x").is_retryable());
        assert!(!ThicketError::serde("x").is_retryable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: ThicketError = io_err.into();
        assert!(matches!(err, ThicketError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ThicketError = json_err.into();
        assert!(matches!(err, ThicketError::Serde { .. }));
    }
}
