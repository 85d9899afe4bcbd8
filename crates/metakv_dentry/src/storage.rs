//! Dentry vectors persisted in the revisioned store.

use crate::dentry::{Dentry, DentryVec};
use crate::key::{children_after, children_end, DentryKey};
use metakv_core::{Applied, CoreError, CoreResult, LogIndex, RevisionedStore, Session};
use std::sync::Arc;

/// Keys fetched per `list_bounded` call while listing a directory.
const LIST_PAGE_SIZE: usize = 128;

/// Reads and writes dentries through the store.
///
/// Mutations go through the store's [`ApplyGate`](metakv_core::ApplyGate),
/// so replaying a log index is a no-op. Reads are plain snapshot reads.
#[derive(Debug, Clone)]
pub struct DentryStorage {
    store: Arc<RevisionedStore>,
}

impl DentryStorage {
    /// Creates storage over `store`.
    #[must_use]
    pub fn new(store: Arc<RevisionedStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &RevisionedStore {
        &self.store
    }

    /// Adds `dentry` under `log_index`.
    ///
    /// # Errors
    ///
    /// [`CoreError::CasConflict`] if another inode holds the name at the
    /// same `tx_id`, or an engine error.
    pub fn insert(&self, dentry: &Dentry, log_index: LogIndex) -> CoreResult<Applied<()>> {
        self.store
            .gate()
            .apply(log_index, |session| insert_in(session, dentry))
    }

    /// Writes a batch of versions of one key under `log_index`.
    ///
    /// With `merge` the versions are upserted into the stored vector,
    /// otherwise they replace it. An empty batch only advances the watermark.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransactionFailed`] if the entries span several keys, or an
    /// engine error. An already applied `log_index` is a duplicate before the
    /// batch is looked at.
    pub fn insert_vec(
        &self,
        dentries: &[Dentry],
        merge: bool,
        log_index: LogIndex,
    ) -> CoreResult<Applied<()>> {
        self.store.gate().apply(log_index, |session| {
            let Some(first) = dentries.first() else {
                return Ok(());
            };
            if dentries.iter().any(|d| !d.same_key(first)) {
                return Err(CoreError::transaction_failed(
                    "dentry batch spans more than one key",
                ));
            }
            let key = DentryKey::of(first).encode();
            let mut vec = if merge {
                load(session, &key)?
            } else {
                DentryVec::new()
            };
            for dentry in dentries {
                vec.upsert(dentry.clone());
            }
            save(session, &key, &vec)
        })
    }

    /// Removes the version of `dentry` under `log_index`.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if that version is not stored, or an engine
    /// error.
    pub fn delete(&self, dentry: &Dentry, log_index: LogIndex) -> CoreResult<Applied<()>> {
        self.store
            .gate()
            .apply(log_index, |session| delete_in(session, dentry))
    }

    /// Version of the name visible at `query.tx_id`.
    ///
    /// Returns `None` if the name never existed or was deleted.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the stored vector cannot be read.
    pub fn get(&self, query: &Dentry) -> CoreResult<Option<Dentry>> {
        let key = DentryKey::of(query).encode();
        let Some(bytes) = self.store.get(&key)? else {
            return Ok(None);
        };
        let vec = DentryVec::decode(&bytes)?;
        Ok(vec
            .visible_at(query.tx_id)
            .filter(|d| !d.is_deleted())
            .cloned())
    }

    /// Children of `query.parent_inode_id` after `query.name`, by name.
    ///
    /// Each name resolves at `query.tx_id`. `limit == 0` lists everything.
    /// All pages are read at one revision.
    ///
    /// # Errors
    ///
    /// Returns an engine error if a stored vector cannot be read.
    pub fn list(&self, query: &Dentry, limit: usize, only_dir: bool) -> CoreResult<Vec<Dentry>> {
        let ceiling = self.store.current_revision();
        let end = children_end(query.fs_id, query.parent_inode_id);
        let mut start = children_after(query.fs_id, query.parent_inode_id, &query.name);
        let mut resumed = false;
        let mut out = Vec::new();

        loop {
            let page = self
                .store
                .list_bounded(&start, &end, LIST_PAGE_SIZE, ceiling)?;
            let full = page.values.len() == LIST_PAGE_SIZE;
            // Pages resume at the previous last key, which was already seen.
            for bytes in page.values.iter().skip(usize::from(resumed)) {
                let vec = DentryVec::decode(bytes)?;
                let Some(dentry) = vec.visible_at(query.tx_id) else {
                    continue;
                };
                if dentry.is_deleted() || (only_dir && !dentry.is_dir()) {
                    continue;
                }
                out.push(dentry.clone());
                if limit != 0 && out.len() == limit {
                    return Ok(out);
                }
            }
            match page.last_key {
                Some(last) if full => {
                    start = last;
                    resumed = true;
                }
                _ => return Ok(out),
            }
        }
    }

    /// Drops every key in the store.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the clear record cannot be written.
    pub fn clear(&self) -> CoreResult<()> {
        self.store.clear()
    }
}

/// Vector stored at `key` as seen by `session`, empty if absent.
pub(crate) fn load(session: &Session<'_>, key: &[u8]) -> CoreResult<DentryVec> {
    match session.get(key) {
        Some(bytes) => Ok(DentryVec::decode(&bytes)?),
        None => Ok(DentryVec::new()),
    }
}

/// Writes `vec` at `key`, deleting the key once the vector is empty.
pub(crate) fn save(session: &mut Session<'_>, key: &[u8], vec: &DentryVec) -> CoreResult<()> {
    if vec.is_empty() {
        session.delete(key);
    } else {
        session.put(key, &vec.encode()?)?;
    }
    Ok(())
}

pub(crate) fn insert_in(session: &mut Session<'_>, dentry: &Dentry) -> CoreResult<()> {
    let key = DentryKey::of(dentry).encode();
    let mut vec = load(session, &key)?;
    if let Some(existing) = vec.find(dentry.tx_id) {
        if existing.inode_id == dentry.inode_id {
            return Ok(());
        }
        return Err(CoreError::cas_conflict(&key));
    }
    vec.upsert(dentry.clone());
    save(session, &key, &vec)
}

pub(crate) fn delete_in(session: &mut Session<'_>, dentry: &Dentry) -> CoreResult<()> {
    let key = DentryKey::of(dentry).encode();
    let mut vec = load(session, &key)?;
    if vec.remove(dentry.tx_id).is_none() {
        return Err(CoreError::not_found(&key));
    }
    save(session, &key, &vec)
}
