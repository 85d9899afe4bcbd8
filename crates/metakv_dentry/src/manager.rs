//! Request-level dentry operations with status reporting.

use crate::dentry::Dentry;
use crate::status::MetaStatusCode;
use crate::storage::DentryStorage;
use crate::tx::TxManager;
use metakv_core::{LogIndex, RevisionedStore};
use std::sync::Arc;
use tracing::{debug, error, info, trace};

const CREATE_DENTRY: &str = "CreateDentry";
const CREATE_DENTRY_VEC: &str = "CreateDentryVec";
const DELETE_DENTRY: &str = "DeleteDentry";
const GET_DENTRY: &str = "GetDentry";
const LIST_DENTRY: &str = "ListDentry";
const HANDLE_RENAME_TX: &str = "HandleRenameTx";
const CREATE_DENTRY_WITH_SNAPSHOT: &str = "CreateDentryWithSnapshot";

/// Entry point for dentry requests coming off the replication log.
///
/// Every operation returns a [`MetaStatusCode`] and logs its outcome:
/// successes at `debug`, failures at `error`. A missing entry is a success
/// for reads and a failure for writes.
///
/// ```rust
/// use metakv_core::{LogIndex, RevisionedStore};
/// use metakv_dentry::{Dentry, DentryManager, FileType, MetaStatusCode};
/// use std::sync::Arc;
///
/// let manager = DentryManager::new(Arc::new(RevisionedStore::open_in_memory().unwrap()));
/// let dentry = Dentry::new(1, 1, "README", 2, 0, FileType::File);
///
/// assert_eq!(manager.create_dentry(&dentry, LogIndex::new(1)), MetaStatusCode::Ok);
/// assert_eq!(manager.create_dentry(&dentry, LogIndex::new(1)), MetaStatusCode::IdempotenceOk);
/// assert_eq!(manager.get_dentry(&dentry).unwrap().inode_id, 2);
/// ```
#[derive(Debug, Clone)]
pub struct DentryManager {
    storage: DentryStorage,
    tx: TxManager,
}

impl DentryManager {
    /// Creates a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<RevisionedStore>) -> Self {
        Self {
            storage: DentryStorage::new(Arc::clone(&store)),
            tx: TxManager::new(store),
        }
    }

    /// The dentry storage.
    #[must_use]
    pub fn storage(&self) -> &DentryStorage {
        &self.storage
    }

    /// Adds `dentry`.
    pub fn create_dentry(&self, dentry: &Dentry, log_index: LogIndex) -> MetaStatusCode {
        log_request(CREATE_DENTRY, dentry);
        let rc = MetaStatusCode::of(&self.storage.insert(dentry, log_index));
        log_code(CREATE_DENTRY, rc);
        rc
    }

    /// Writes several versions of one key, merged into or replacing what is
    /// stored.
    pub fn create_dentry_vec(
        &self,
        dentries: &[Dentry],
        merge: bool,
        log_index: LogIndex,
    ) -> MetaStatusCode {
        for dentry in dentries {
            log_request(CREATE_DENTRY_VEC, dentry);
        }
        let rc = MetaStatusCode::of(&self.storage.insert_vec(dentries, merge, log_index));
        log_code(CREATE_DENTRY_VEC, rc);
        rc
    }

    /// Removes the version of `dentry`.
    pub fn delete_dentry(&self, dentry: &Dentry, log_index: LogIndex) -> MetaStatusCode {
        log_request(DELETE_DENTRY, dentry);
        let rc = MetaStatusCode::of(&self.storage.delete(dentry, log_index));
        log_code(DELETE_DENTRY, rc);
        rc
    }

    /// Looks up the name in `query` as of `query.tx_id`.
    ///
    /// # Errors
    ///
    /// [`MetaStatusCode::NotFound`] if the name is absent, or
    /// [`MetaStatusCode::EngineUnavailable`].
    pub fn get_dentry(&self, query: &Dentry) -> Result<Dentry, MetaStatusCode> {
        log_request(GET_DENTRY, query);
        let result = match self.storage.get(query) {
            Ok(Some(dentry)) => Ok(dentry),
            Ok(None) => Err(MetaStatusCode::NotFound),
            Err(err) => Err(MetaStatusCode::from(err)),
        };
        log_code(GET_DENTRY, result.as_ref().err().copied().unwrap_or(MetaStatusCode::Ok));
        result
    }

    /// Lists children of `query.parent_inode_id` after `query.name`.
    ///
    /// `limit == 0` lists everything; `only_dir` keeps directories only.
    ///
    /// # Errors
    ///
    /// [`MetaStatusCode::NotFound`] if nothing matches, or
    /// [`MetaStatusCode::EngineUnavailable`].
    pub fn list_dentry(
        &self,
        query: &Dentry,
        limit: usize,
        only_dir: bool,
    ) -> Result<Vec<Dentry>, MetaStatusCode> {
        log_request(LIST_DENTRY, query);
        let result = match self.storage.list(query, limit, only_dir) {
            Ok(dentries) if dentries.is_empty() => Err(MetaStatusCode::NotFound),
            Ok(dentries) => Ok(dentries),
            Err(err) => Err(MetaStatusCode::from(err)),
        };
        log_code(LIST_DENTRY, result.as_ref().err().copied().unwrap_or(MetaStatusCode::Ok));
        result
    }

    /// Drops every dentry. Not gated by the log.
    pub fn clear_dentry(&self) -> MetaStatusCode {
        match self.storage.clear() {
            Ok(()) => {
                info!("ClearDentry ok");
                MetaStatusCode::Ok
            }
            Err(err) => {
                error!(error = %err, "ClearDentry failed");
                MetaStatusCode::from(err)
            }
        }
    }

    /// Applies a rename as one transaction.
    pub fn handle_rename_tx(&self, dentries: &[Dentry], log_index: LogIndex) -> MetaStatusCode {
        for dentry in dentries {
            log_request(HANDLE_RENAME_TX, dentry);
        }
        let rc = MetaStatusCode::of(&self.tx.handle_rename_tx(dentries, log_index));
        log_code(HANDLE_RENAME_TX, rc);
        rc
    }

    /// Creates `dentry` together with its `snapshot` entry.
    pub fn create_dentry_with_snapshot(
        &self,
        dentry: &Dentry,
        snapshot: &Dentry,
        log_index: LogIndex,
    ) -> MetaStatusCode {
        log_request(CREATE_DENTRY_WITH_SNAPSHOT, dentry);
        log_request(CREATE_DENTRY_WITH_SNAPSHOT, snapshot);
        let rc = MetaStatusCode::of(&self.tx.create_with_snapshot(dentry, snapshot, log_index));
        log_code(CREATE_DENTRY_WITH_SNAPSHOT, rc);
        rc
    }
}

fn log_request(request: &str, dentry: &Dentry) {
    trace!("Receive {request} request, dentry = ({dentry})");
}

/// Whether `rc` counts as success for `request`.
fn is_success(request: &str, rc: MetaStatusCode) -> bool {
    match rc {
        MetaStatusCode::Ok | MetaStatusCode::IdempotenceOk => true,
        MetaStatusCode::NotFound => request == GET_DENTRY || request == LIST_DENTRY,
        _ => false,
    }
}

fn log_code(request: &str, rc: MetaStatusCode) {
    if is_success(request, rc) {
        debug!("{request} success, retCode = {rc}");
    } else {
        error!("{request} fail, retCode = {rc}");
    }
}
