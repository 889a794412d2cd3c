//! Error types for ostrich operations.
//!
//! Every failure carries a structured error code so callers can tell
//! precondition rejects apart from lifecycle misuse and store failures.
//! Errors are `Clone` because a memoized open or a settled count may be
//! observed by more than one consumer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Result type alias for ostrich operations.
pub type OstrichResult<T> = Result<T, OstrichError>;

/// Main error type for all ostrich operations.
#[derive(Error, Debug, Clone)]
pub enum OstrichError {
    /// A resolve request failed validation before any store call.
    #[error("Validation error: {message}")]
    Validation { message: String, code: ErrorCode },

    /// The archive manager was used in a state that does not allow it.
    #[error("Lifecycle error: {message}")]
    Lifecycle { message: String, code: ErrorCode },

    /// The underlying store failed to open, search, count or close.
    #[error("Store error: {message}")]
    Store { message: String, code: ErrorCode },

    /// No archive exists at the requested path.
    #[error("Archive not found: {}", path.display())]
    ArchiveNotFound { path: PathBuf, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValMissingSource,
    ValInvalidGraph,
    ValInvalidVersionContext,

    // Lifecycle (LC_xxx)
    LcAlreadyClosed,
    LcManagerClosed,

    // Store (STORE_xxx)
    StoreFetchFailed,
    StoreCountFailed,
    StoreClosed,
    StoreNotFound,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValMissingSource => "VAL_001",
            ErrorCode::ValInvalidGraph => "VAL_002",
            ErrorCode::ValInvalidVersionContext => "VAL_003",
            ErrorCode::LcAlreadyClosed => "LC_001",
            ErrorCode::LcManagerClosed => "LC_002",
            ErrorCode::StoreFetchFailed => "STORE_001",
            ErrorCode::StoreCountFailed => "STORE_002",
            ErrorCode::StoreClosed => "STORE_003",
            ErrorCode::StoreNotFound => "STORE_004",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OstrichError {
    /// Create a validation error with the given code.
    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code,
        }
    }

    /// Create the error returned for a missing or ambiguous archive source.
    pub fn missing_source(message: impl Into<String>) -> Self {
        Self::validation(ErrorCode::ValMissingSource, message)
    }

    /// Create the error returned for a named graph in a pattern.
    pub fn invalid_graph(message: impl Into<String>) -> Self {
        Self::validation(ErrorCode::ValInvalidGraph, message)
    }

    /// Create the error returned for an unrecognized temporal context.
    pub fn invalid_version_context(message: impl Into<String>) -> Self {
        Self::validation(ErrorCode::ValInvalidVersionContext, message)
    }

    /// Create a lifecycle error.
    pub fn lifecycle(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
            code,
        }
    }

    /// Create a store error.
    pub fn store(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            code,
        }
    }

    /// Create a search failure.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::store(ErrorCode::StoreFetchFailed, message)
    }

    /// Create a count failure.
    pub fn count(message: impl Into<String>) -> Self {
        Self::store(ErrorCode::StoreCountFailed, message)
    }

    /// Create the error returned when a closed store is used.
    pub fn store_closed(path: impl AsRef<Path>) -> Self {
        Self::store(
            ErrorCode::StoreClosed,
            format!("store for '{}' is already closed", path.as_ref().display()),
        )
    }

    /// Create an archive-not-found error.
    pub fn archive_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ArchiveNotFound {
            path: path.into(),
            code: ErrorCode::StoreNotFound,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::Lifecycle { code, .. } => *code,
            Self::Store { code, .. } => *code,
            Self::ArchiveNotFound { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error is a precondition reject raised before any store call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this error comes from lifecycle misuse.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Lifecycle { .. })
    }
}

impl From<std::io::Error> for OstrichError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
