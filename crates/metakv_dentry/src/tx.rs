//! Coordinated dentry transactions.

use crate::dentry::Dentry;
use crate::key::DentryKey;
use crate::storage::{insert_in, load, save};
use metakv_core::{Applied, CoreError, CoreResult, LogIndex, RevisionedStore};
use std::sync::Arc;

/// Runs multi-dentry changes as single coordinated transactions.
#[derive(Debug, Clone)]
pub struct TxManager {
    store: Arc<RevisionedStore>,
}

impl TxManager {
    /// Creates a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<RevisionedStore>) -> Self {
        Self { store }
    }

    /// Applies the dentry changes of a rename.
    ///
    /// Versions flagged [`DELETE_MARK`](crate::DentryFlags::DELETE_MARK)
    /// remove the stored version with the same key and `tx_id`. Every other
    /// version is upserted.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if `dentries` is empty or a removed
    /// version is not stored. Nothing is written in either case. An already
    /// applied `log_index` is a duplicate before either check.
    pub fn handle_rename_tx(
        &self,
        dentries: &[Dentry],
        log_index: LogIndex,
    ) -> CoreResult<Applied<()>> {
        self.store.coordinator().run(log_index, |session| {
            if dentries.is_empty() {
                return Err(CoreError::transaction_failed("rename carries no dentries"));
            }
            for dentry in dentries {
                let key = DentryKey::of(dentry).encode();
                let mut vec = load(session, &key)?;
                if dentry.is_deleted() {
                    vec.remove(dentry.tx_id)
                        .ok_or_else(|| CoreError::not_found(&key))?;
                } else {
                    vec.upsert(dentry.clone());
                }
                save(session, &key, &vec)?;
            }
            Ok(())
        })
    }

    /// Creates `dentry` and its `snapshot` twin in one transaction.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if either create conflicts.
    pub fn create_with_snapshot(
        &self,
        dentry: &Dentry,
        snapshot: &Dentry,
        log_index: LogIndex,
    ) -> CoreResult<Applied<()>> {
        self.store.coordinator().run(log_index, |session| {
            insert_in(session, dentry)?;
            insert_in(session, snapshot)
        })
    }
}
