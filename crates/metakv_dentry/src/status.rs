//! Status codes reported by the dentry facade.

use metakv_core::{Applied, CoreError, CoreResult, ErrorKind};
use std::fmt;

/// Outcome of a dentry request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaStatusCode {
    /// The request took effect.
    Ok,
    /// The log index was already applied; nothing changed.
    IdempotenceOk,
    /// The entry does not exist.
    NotFound,
    /// The name is taken by a different inode, or a compare-and-swap failed.
    CasConflict,
    /// A coordinated transaction was aborted.
    TransactionFailed,
    /// The engine could not serve the request.
    EngineUnavailable,
}

impl MetaStatusCode {
    /// Wire name of the code.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::IdempotenceOk => "IDEMPOTENCE_OK",
            Self::NotFound => "NOT_FOUND",
            Self::CasConflict => "CAS_CONFLICT",
            Self::TransactionFailed => "TRANSACTION_FAILED",
            Self::EngineUnavailable => "ENGINE_UNAVAILABLE",
        }
    }

    /// Status of a gated mutation.
    pub fn of<T>(result: &CoreResult<Applied<T>>) -> Self {
        match result {
            Ok(Applied::Done(_)) => Self::Ok,
            Ok(Applied::Duplicate) => Self::IdempotenceOk,
            Err(err) => err.into(),
        }
    }
}

impl From<&CoreError> for MetaStatusCode {
    fn from(err: &CoreError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::CasConflict => Self::CasConflict,
            ErrorKind::TransactionFailure => Self::TransactionFailed,
            ErrorKind::EngineUnavailable => Self::EngineUnavailable,
        }
    }
}

impl From<CoreError> for MetaStatusCode {
    fn from(err: CoreError) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for MetaStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
