//! Error types for the MetaKV core.
//!
//! Every engine-level fault is normalized here. Storage and I/O errors never
//! leave this crate as their own types; they become
//! [`CoreError::EngineUnavailable`] carrying the rendered message.

use metakv_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification of a [`CoreError`].
///
/// A replayed log index is not an error and has no kind here; the apply gate
/// reports it as [`crate::Applied::Duplicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The key or version a write depends on does not exist.
    NotFound,
    /// An expected value did not match.
    CasConflict,
    /// A multi-key transaction was rolled back.
    TransactionFailure,
    /// The persistence engine is unreachable, corrupted or erroring.
    EngineUnavailable,
}

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A key required by a write does not exist.
    #[error("key not found: {key}")]
    NotFound {
        /// Rendered key.
        key: String,
    },

    /// Compare-and-swap found a different current value.
    #[error("compare-and-swap conflict on key {key}")]
    CasConflict {
        /// Rendered key.
        key: String,
    },

    /// A sub-mutation of a coordinated transaction failed.
    #[error("transaction failed: {reason}")]
    TransactionFailed {
        /// Why the transaction was rolled back.
        reason: String,
    },

    /// The persistence engine could not serve the request.
    #[error("engine unavailable: {message}")]
    EngineUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// The commit log is structurally invalid.
    #[error("commit log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// A commit log record failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the record.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// The call is not valid for the given arguments or store state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a not-found error, rendering the key lossily.
    pub fn not_found(key: &[u8]) -> Self {
        Self::NotFound {
            key: render_key(key),
        }
    }

    /// Creates a compare-and-swap conflict error.
    pub fn cas_conflict(key: &[u8]) -> Self {
        Self::CasConflict {
            key: render_key(key),
        }
    }

    /// Creates a transaction failure.
    pub fn transaction_failed(reason: impl Into<String>) -> Self {
        Self::TransactionFailed {
            reason: reason.into(),
        }
    }

    /// Creates an engine-unavailable error.
    pub fn engine_unavailable(message: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            message: message.into(),
        }
    }

    /// Creates a commit log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the taxonomy this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::CasConflict { .. } => ErrorKind::CasConflict,
            Self::TransactionFailed { .. } | Self::InvalidOperation { .. } => {
                ErrorKind::TransactionFailure
            }
            Self::EngineUnavailable { .. }
            | Self::LogCorruption { .. }
            | Self::ChecksumMismatch { .. }
            | Self::StoreLocked => ErrorKind::EngineUnavailable,
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        Self::engine_unavailable(err.to_string())
    }
}

impl From<io::Error> for CoreError {
    fn from(err: io::Error) -> Self {
        Self::engine_unavailable(format!("I/O error: {err}"))
    }
}

/// Renders a key for error messages and logs.
pub(crate) fn render_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
