//! Multi-key transactions guarded by a single log index.

use crate::apply::{ApplyGate, Applied};
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::store::RevisionedStore;
use crate::transaction::Session;
use crate::types::{CasOutcome, LogIndex, Revision};
use tracing::debug;

/// One step of a coordinated transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Write a value.
    Put {
        /// Key.
        key: Vec<u8>,
        /// Value.
        value: Vec<u8>,
    },
    /// Tombstone a key whether or not it exists.
    Delete {
        /// Key.
        key: Vec<u8>,
    },
    /// Tombstone a key that must exist.
    DeleteExisting {
        /// Key.
        key: Vec<u8>,
    },
    /// Write `new` if the current value is `expected` (`None`: absent).
    CompareAndSwap {
        /// Key.
        key: Vec<u8>,
        /// Required current value.
        expected: Option<Vec<u8>>,
        /// Replacement.
        new: Vec<u8>,
    },
}

impl Mutation {
    /// Shorthand for [`Mutation::Put`].
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Shorthand for [`Mutation::Delete`].
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// Shorthand for [`Mutation::DeleteExisting`].
    pub fn delete_existing(key: impl Into<Vec<u8>>) -> Self {
        Self::DeleteExisting { key: key.into() }
    }

    fn execute(&self, session: &mut Session<'_>) -> CoreResult<Revision> {
        match self {
            Self::Put { key, value } => session.put(key, value),
            Self::Delete { key } => Ok(session.delete(key)),
            Self::DeleteExisting { key } => session.delete_existing(key),
            Self::CompareAndSwap { key, expected, new } => {
                match session.compare_and_swap(key, expected.as_deref(), new)? {
                    CasOutcome::Swapped(revision) => Ok(revision),
                    CasOutcome::Conflict => Err(CoreError::cas_conflict(key)),
                }
            }
        }
    }
}

/// Runs several mutations as one atomic, idempotent unit.
///
/// The duplicate check happens once for the whole set. Every step runs in a
/// single session: any failing step rolls back all of them, and success
/// commits them together with one watermark advance.
///
/// Step failures surface as [`CoreError::TransactionFailed`]; engine
/// failures keep their own type.
///
/// ```rust
/// use metakv_core::{LogIndex, Mutation, RevisionedStore};
///
/// let store = RevisionedStore::open_in_memory().unwrap();
/// store.put(b"old", b"inode-7").unwrap();
///
/// let rename = [Mutation::delete_existing("old"), Mutation::put("new", "inode-7")];
/// store.coordinator().commit(LogIndex::new(1), &rename).unwrap();
/// assert_eq!(store.get(b"old").unwrap(), None);
/// assert_eq!(store.get(b"new").unwrap(), Some(b"inode-7".to_vec()));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TransactionCoordinator<'a> {
    gate: ApplyGate<'a>,
}

impl<'a> TransactionCoordinator<'a> {
    /// Creates a coordinator over `store`.
    #[must_use]
    pub fn new(store: &'a RevisionedStore) -> Self {
        Self {
            gate: ApplyGate::new(store),
        }
    }

    /// Applies `mutations` in order under `log_index`.
    ///
    /// Returns the revision of each step.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TransactionFailed`] if the list is empty or a step
    /// fails, or an engine error if the commit fails. A replayed `log_index`
    /// is [`Applied::Duplicate`] even for an empty list.
    pub fn commit(
        &self,
        log_index: LogIndex,
        mutations: &[Mutation],
    ) -> CoreResult<Applied<Vec<Revision>>> {
        self.run(log_index, |session| {
            if mutations.is_empty() {
                return Err(CoreError::transaction_failed("empty transaction"));
            }
            mutations
                .iter()
                .map(|mutation| mutation.execute(session))
                .collect()
        })
    }

    /// Runs arbitrary session logic as one coordinated transaction.
    ///
    /// # Errors
    ///
    /// Errors from `body` other than engine failures are reported as
    /// [`CoreError::TransactionFailed`].
    pub fn run<T, F>(&self, log_index: LogIndex, body: F) -> CoreResult<Applied<T>>
    where
        F: FnOnce(&mut Session<'a>) -> CoreResult<T>,
    {
        self.gate
            .apply(log_index, |session| {
                let pending_before = session.pending_ops();
                body(&mut *session).map_err(|err| {
                    debug!(
                        %log_index,
                        steps = session.pending_ops() - pending_before,
                        error = %err,
                        "coordinated transaction rolled back"
                    );
                    err
                })
            })
            .map_err(into_transaction_failure)
    }
}

fn into_transaction_failure(err: CoreError) -> CoreError {
    match err.kind() {
        ErrorKind::EngineUnavailable | ErrorKind::TransactionFailure => err,
        ErrorKind::NotFound | ErrorKind::CasConflict => {
            CoreError::transaction_failed(err.to_string())
        }
    }
}
