//! Idempotent application of replicated log entries.
//!
//! The replication layer delivers `(log index, operation)` pairs at least
//! once. The gate compares each index against the store's applied-index
//! watermark and skips anything already applied. The watermark is written in
//! the same commit record as the mutation it guards, so a crash can never
//! separate the two.

use crate::error::{CoreError, CoreResult};
use crate::store::RevisionedStore;
use crate::transaction::Session;
use crate::types::{CasOutcome, LogIndex, Revision};
use tracing::debug;

/// Outcome of a gated mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied<T> {
    /// The mutation ran and committed.
    Done(T),
    /// The index was already applied; nothing ran.
    Duplicate,
}

impl<T> Applied<T> {
    /// Whether the call was short-circuited.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }

    /// The mutation's result, if it ran.
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Duplicate => None,
        }
    }
}

/// Filters mutations by log index.
///
/// ```rust
/// use metakv_core::{Applied, LogIndex, RevisionedStore};
///
/// let store = RevisionedStore::open_in_memory().unwrap();
/// let gate = store.gate();
/// let first = gate.apply(LogIndex::new(7), |s| s.put(b"k", b"v")).unwrap();
/// assert!(matches!(first, Applied::Done(_)));
///
/// let again = gate.apply(LogIndex::new(7), |s| s.put(b"k", b"other")).unwrap();
/// assert!(again.is_duplicate());
/// assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ApplyGate<'a> {
    store: &'a RevisionedStore,
}

impl<'a> ApplyGate<'a> {
    /// Creates a gate over `store`.
    #[must_use]
    pub fn new(store: &'a RevisionedStore) -> Self {
        Self { store }
    }

    /// Runs `mutation` for `log_index` unless that index is already applied.
    ///
    /// The mutation gets a fresh session. If it returns `Ok`, the session
    /// commits with the watermark advanced to `log_index`. If it returns an
    /// error, the session rolls back and the watermark stays.
    ///
    /// # Errors
    ///
    /// Returns the mutation's error, or a commit failure.
    pub fn apply<T, F>(&self, log_index: LogIndex, mutation: F) -> CoreResult<Applied<T>>
    where
        F: FnOnce(&mut Session<'a>) -> CoreResult<T>,
    {
        let mut session = self.store.begin_session()?;
        let applied = session.applied_index();
        if applied.covers(log_index) {
            debug!(%log_index, applied_index = %applied, "log entry already applied");
            return Ok(Applied::Duplicate);
        }

        let value = mutation(&mut session)?;
        session.advance_applied(log_index);
        session.commit()?;
        Ok(Applied::Done(value))
    }

    /// Gated put.
    ///
    /// # Errors
    ///
    /// See [`Session::put`].
    pub fn put(
        &self,
        log_index: LogIndex,
        key: &[u8],
        value: &[u8],
    ) -> CoreResult<Applied<Revision>> {
        self.apply(log_index, |session| session.put(key, value))
    }

    /// Gated delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn delete(&self, log_index: LogIndex, key: &[u8]) -> CoreResult<Applied<Revision>> {
        self.apply(log_index, |session| Ok(session.delete(key)))
    }

    /// Gated compare-and-swap. A conflict is an error so that the watermark
    /// does not move.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CasConflict`] if the current value differs.
    pub fn compare_and_swap(
        &self,
        log_index: LogIndex,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> CoreResult<Applied<Revision>> {
        self.apply(log_index, |session| {
            match session.compare_and_swap(key, expected, new)? {
                CasOutcome::Swapped(revision) => Ok(revision),
                CasOutcome::Conflict => Err(CoreError::cas_conflict(key)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppliedIndex;

    #[test]
    fn scenario_duplicate_delete_is_skipped() {
        let store = RevisionedStore::open_in_memory().unwrap();
        store.put(b"x", b"keep").unwrap();
        let gate = store.gate();
        gate.put(LogIndex::new(5), b"y", b"1").unwrap();
        assert_eq!(store.applied_index(), AppliedIndex::at(LogIndex::new(5)));

        let rev = store.current_revision();
        assert!(gate.delete(LogIndex::new(5), b"x").unwrap().is_duplicate());
        assert_eq!(store.get(b"x").unwrap(), Some(b"keep".to_vec()));
        assert_eq!(store.current_revision(), rev);

        assert!(!gate.delete(LogIndex::new(6), b"x").unwrap().is_duplicate());
        assert_eq!(store.get(b"x").unwrap(), None);
        assert_eq!(store.applied_index(), AppliedIndex::at(LogIndex::new(6)));
    }

    #[test]
    fn fresh_store_accepts_index_zero_once() {
        let store = RevisionedStore::open_in_memory().unwrap();
        let gate = store.gate();
        assert!(!gate.put(LogIndex::new(0), b"k", b"v").unwrap().is_duplicate());
        assert!(gate.put(LogIndex::new(0), b"k", b"w").unwrap().is_duplicate());
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn failed_mutation_keeps_watermark() {
        let store = RevisionedStore::open_in_memory().unwrap();
        let gate = store.gate();
        gate.put(LogIndex::new(1), b"k", b"v").unwrap();

        let result = gate.apply(LogIndex::new(2), |s| {
            s.put(b"other", b"x")?;
            s.delete_existing(b"missing")
        });
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
        assert_eq!(store.applied_index(), AppliedIndex::at(LogIndex::new(1)));
        assert_eq!(store.get(b"other").unwrap(), None);

        // the same index can be retried after a failure
        assert!(!gate.put(LogIndex::new(2), b"other", b"y").unwrap().is_duplicate());
    }

    #[test]
    fn cas_conflict_keeps_watermark() {
        let store = RevisionedStore::open_in_memory().unwrap();
        let gate = store.gate();
        gate.put(LogIndex::new(1), b"k", b"v1").unwrap();

        let result = gate.compare_and_swap(LogIndex::new(2), b"k", Some(&b"nope"[..]), b"v2");
        assert!(matches!(result, Err(CoreError::CasConflict { .. })));
        assert_eq!(store.applied_index(), AppliedIndex::at(LogIndex::new(1)));

        let swapped = gate
            .compare_and_swap(LogIndex::new(2), b"k", Some(&b"v1"[..]), b"v2")
            .unwrap();
        assert_eq!(swapped, Applied::Done(Revision::new(2)));
    }

    #[test]
    fn empty_mutation_still_advances_watermark() {
        let store = RevisionedStore::open_in_memory().unwrap();
        let applied = store.gate().apply(LogIndex::new(3), |_| Ok(())).unwrap();
        assert_eq!(applied, Applied::Done(()));
        assert_eq!(store.applied_index(), AppliedIndex::at(LogIndex::new(3)));
        assert_eq!(store.current_revision(), Revision::ZERO);
    }
}
