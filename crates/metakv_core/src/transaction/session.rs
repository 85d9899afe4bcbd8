//! Scoped write sessions.

use crate::error::{CoreError, CoreResult};
use crate::transaction::manager::SessionManager;
use crate::types::{AppliedIndex, CasOutcome, LogIndex, Revision, TxnId};
use crate::wal::LogOp;
use parking_lot::MutexGuard;
use std::collections::BTreeMap;
use tracing::debug;

/// An exclusive write transaction on the store.
///
/// Writes are buffered and invisible to other readers until [`Session::commit`].
/// Reads through the session see its own pending writes. Dropping a session
/// without committing rolls it back, and the writer lock goes with it.
///
/// ```rust
/// use metakv_core::RevisionedStore;
///
/// let store = RevisionedStore::open_in_memory().unwrap();
/// let mut session = store.begin_session().unwrap();
/// session.put(b"old", b"v").unwrap();
/// session.delete(b"old");
/// session.put(b"new", b"v").unwrap();
/// session.commit().unwrap();
/// assert_eq!(store.get(b"new").unwrap(), Some(b"v".to_vec()));
/// ```
pub struct Session<'a> {
    manager: &'a SessionManager,
    _writer: MutexGuard<'a, ()>,
    txid: TxnId,
    next_revision: Revision,
    ops: Vec<LogOp>,
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    applied: Option<LogIndex>,
    finished: bool,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        manager: &'a SessionManager,
        writer: MutexGuard<'a, ()>,
        txid: TxnId,
        next_revision: Revision,
    ) -> Self {
        Self {
            manager,
            _writer: writer,
            txid,
            next_revision,
            ops: Vec::new(),
            overlay: BTreeMap::new(),
            applied: None,
            finished: false,
        }
    }

    /// This session's identifier.
    #[must_use]
    pub fn txid(&self) -> TxnId {
        self.txid
    }

    /// Number of buffered mutations.
    #[must_use]
    pub fn pending_ops(&self) -> usize {
        self.ops.len()
    }

    /// The committed watermark. Stable for the session's lifetime.
    #[must_use]
    pub fn applied_index(&self) -> AppliedIndex {
        self.manager.index().applied()
    }

    /// Latest value of `key`, including this session's pending writes.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.overlay.get(key) {
            Some(pending) => pending.clone(),
            None => self.manager.index().latest(key).map(<[u8]>::to_vec),
        }
    }

    /// Buffers a write of `value` and returns the revision it will carry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if the value exceeds the
    /// configured maximum size.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> CoreResult<Revision> {
        let max = self.manager.max_value_size();
        if value.len() > max {
            return Err(CoreError::invalid_operation(format!(
                "value of {} bytes exceeds the {max} byte limit",
                value.len()
            )));
        }
        let revision = self.allocate();
        self.overlay.insert(key.to_vec(), Some(value.to_vec()));
        self.ops.push(LogOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
            revision,
        });
        Ok(revision)
    }

    /// Buffers a tombstone for `key`, whether or not it exists.
    pub fn delete(&mut self, key: &[u8]) -> Revision {
        let revision = self.allocate();
        self.overlay.insert(key.to_vec(), None);
        self.ops.push(LogOp::Delete {
            key: key.to_vec(),
            revision,
        });
        revision
    }

    /// Buffers a tombstone for `key`, which must currently exist.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `key` has no live value.
    pub fn delete_existing(&mut self, key: &[u8]) -> CoreResult<Revision> {
        if self.get(key).is_none() {
            return Err(CoreError::not_found(key));
        }
        Ok(self.delete(key))
    }

    /// Writes `new` if the current value equals `expected`.
    ///
    /// `expected = None` means "key absent" and turns the swap into an insert.
    ///
    /// # Errors
    ///
    /// Only fails for the same reasons as [`Session::put`]; a mismatch is
    /// [`CasOutcome::Conflict`].
    pub fn compare_and_swap(
        &mut self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> CoreResult<CasOutcome> {
        if self.get(key).as_deref() != expected {
            return Ok(CasOutcome::Conflict);
        }
        self.put(key, new).map(CasOutcome::Swapped)
    }

    /// Records that this session applies replication log entry `index`.
    pub(crate) fn advance_applied(&mut self, index: LogIndex) {
        self.applied = Some(index);
    }

    /// Makes every buffered write durable and visible at once.
    ///
    /// Returns the store's current revision after the commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit record cannot be written; nothing is
    /// applied in that case.
    pub fn commit(mut self) -> CoreResult<Revision> {
        self.finished = true;
        if self.ops.is_empty() && self.applied.is_none() {
            debug!(txid = %self.txid, "empty session committed");
            return Ok(self.manager.index().current_revision());
        }

        let ops = std::mem::take(&mut self.ops);
        let count = ops.len();
        match self.manager.publish(self.txid, self.applied, ops) {
            Ok(revision) => {
                debug!(txid = %self.txid, ops = count, %revision, "session committed");
                Ok(revision)
            }
            Err(err) => {
                debug!(txid = %self.txid, ops = count, error = %err, "session commit failed");
                Err(err)
            }
        }
    }

    /// Discards every buffered write.
    pub fn rollback(self) {
        drop(self);
    }

    fn allocate(&mut self) -> Revision {
        let revision = self.next_revision;
        self.next_revision = revision.next();
        revision
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(txid = %self.txid, pending = self.ops.len(), "session rolled back");
        }
    }
}
