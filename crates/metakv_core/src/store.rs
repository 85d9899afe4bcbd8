//! The revisioned key-value store.

use crate::apply::ApplyGate;
use crate::config::Config;
use crate::coordinator::TransactionCoordinator;
use crate::dir::StoreDir;
use crate::error::CoreResult;
use crate::transaction::{Session, SessionManager};
use crate::types::{AppliedIndex, CasOutcome, Revision};
use crate::wal::CommitLog;
use metakv_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::Path;
use tracing::info;

/// One page of a bounded listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoundedPage {
    /// Values in key order.
    pub values: Vec<Vec<u8>>,
    /// Key of the last value, `None` for an empty page.
    ///
    /// Passing it back as the next start key resumes the listing *including*
    /// this key, so it shows up again as the first value of the next page.
    pub last_key: Option<Vec<u8>>,
}

/// Point-in-time counters, as printed by `metakv inspect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Keys with at least one version.
    pub keys: usize,
    /// Keys whose latest version is not a tombstone.
    pub live_keys: usize,
    /// Versions held, tombstones included.
    pub records: u64,
    /// Highest revision stamped.
    pub current_revision: Revision,
    /// Applied-index watermark.
    pub applied_index: AppliedIndex,
    /// Commit log size in bytes.
    pub log_size: u64,
}

/// A versioned key-value store.
///
/// Keys and values are opaque bytes. Every put, delete and successful swap
/// gets a revision from one store-wide counter; reads can ask for the state
/// as of any revision. Deletes write tombstones, so old revisions stay
/// readable.
///
/// # Example
///
/// ```rust
/// use metakv_core::{CasOutcome, RevisionedStore};
///
/// let store = RevisionedStore::open_in_memory().unwrap();
/// let first = store.put(b"a", b"v1").unwrap();
/// store.put(b"a", b"v2").unwrap();
///
/// assert_eq!(store.get(b"a").unwrap(), Some(b"v2".to_vec()));
/// assert_eq!(store.get_at(b"a", first).unwrap(), Some(b"v1".to_vec()));
///
/// let swapped = store.compare_and_swap(b"a", Some(&b"v2"[..]), b"v3").unwrap();
/// assert!(swapped.is_swapped());
/// let stale = store.compare_and_swap(b"a", Some(&b"v2"[..]), b"v4").unwrap();
/// assert_eq!(stale, CasOutcome::Conflict);
/// ```
pub struct RevisionedStore {
    config: Config,
    manager: SessionManager,
    dir: Option<StoreDir>,
}

impl RevisionedStore {
    /// Opens the store at `path` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be opened or locked, or the
    /// commit log is corrupted.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be opened or locked, or the
    /// commit log is corrupted.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing, config.error_if_exists)?;
        let backend = FileBackend::open(&dir.log_path())?;
        info!(path = %path.display(), "opening store");
        Self::build(config, Box::new(backend), Some(dir))
    }

    /// Opens a store over an arbitrary backend, replaying whatever it holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit log is corrupted or unreadable.
    pub fn open_with_backend(config: Config, backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        Self::build(config, backend, None)
    }

    /// Opens an empty in-memory store.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches the other constructors.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Config::default(), Box::new(InMemoryBackend::new()))
    }

    fn build(
        config: Config,
        backend: Box<dyn StorageBackend>,
        dir: Option<StoreDir>,
    ) -> CoreResult<Self> {
        let log = CommitLog::new(backend, config.sync_on_commit);
        let (manager, _summary) = SessionManager::recover(log, &config)?;
        Ok(Self {
            config,
            manager,
            dir,
        })
    }

    /// Syncs the commit log and releases the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails.
    pub fn close(self) -> CoreResult<()> {
        self.manager.log().sync()?;
        info!(revision = %self.current_revision(), "store closed");
        Ok(())
    }

    /// The configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory of a file-backed store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    /// Starts an exclusive write session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::EngineUnavailable`] if the configured
    /// session timeout expires while another session is open.
    pub fn begin_session(&self) -> CoreResult<Session<'_>> {
        self.manager.begin()
    }

    /// Idempotence filter over this store.
    #[must_use]
    pub fn gate(&self) -> ApplyGate<'_> {
        ApplyGate::new(self)
    }

    /// Multi-key transaction runner over this store.
    #[must_use]
    pub fn coordinator(&self) -> TransactionCoordinator<'_> {
        TransactionCoordinator::new(self)
    }

    /// Writes `value` under `key` and returns the revision it got.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is too large or the commit fails.
    pub fn put(&self, key: &[u8], value: &[u8]) -> CoreResult<Revision> {
        let mut session = self.begin_session()?;
        let revision = session.put(key, value)?;
        session.commit()?;
        Ok(revision)
    }

    /// Same as [`RevisionedStore::put`], for callers that forward the revision.
    ///
    /// # Errors
    ///
    /// See [`RevisionedStore::put`].
    pub fn put_with_revision(&self, key: &[u8], value: &[u8]) -> CoreResult<Revision> {
        self.put(key, value)
    }

    /// Latest value of `key`. Absence is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Reads are served from memory and do not currently fail.
    pub fn get(&self, key: &[u8]) -> CoreResult<Option<Vec<u8>>> {
        Ok(self.manager.index().latest(key).map(<[u8]>::to_vec))
    }

    /// Value of `key` as of `ceiling`.
    ///
    /// # Errors
    ///
    /// Reads are served from memory and do not currently fail.
    pub fn get_at(&self, key: &[u8], ceiling: Revision) -> CoreResult<Option<Vec<u8>>> {
        Ok(self.manager.index().get_at(key, ceiling).map(<[u8]>::to_vec))
    }

    /// Latest values of all keys in `[start, end)`, in key order.
    ///
    /// # Errors
    ///
    /// Reads are served from memory and do not currently fail.
    pub fn list(&self, start: &[u8], end: &[u8]) -> CoreResult<Vec<Vec<u8>>> {
        Ok(self
            .list_pairs(start, end)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// Latest `(key, value)` pairs in `[start, end)`, in key order.
    ///
    /// # Errors
    ///
    /// Reads are served from memory and do not currently fail.
    pub fn list_pairs(&self, start: &[u8], end: &[u8]) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let index = self.manager.index();
        Ok(index.range(start, end, index.current_revision(), None))
    }

    /// `(key, value)` pairs in `[start, end)` as of `ceiling`, in key order.
    ///
    /// # Errors
    ///
    /// Reads are served from memory and do not currently fail.
    pub fn list_pairs_at(
        &self,
        start: &[u8],
        end: &[u8],
        ceiling: Revision,
    ) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.manager.index().range(start, end, ceiling, None))
    }

    /// At most `limit` values from `[start, end)` as of `ceiling`.
    ///
    /// See [`BoundedPage::last_key`] for how to continue.
    ///
    /// # Errors
    ///
    /// Reads are served from memory and do not currently fail.
    pub fn list_bounded(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
        ceiling: Revision,
    ) -> CoreResult<BoundedPage> {
        if limit == 0 {
            return Ok(BoundedPage::default());
        }
        let pairs = self.manager.index().range(start, end, ceiling, Some(limit));
        let last_key = pairs.last().map(|(key, _)| key.clone());
        Ok(BoundedPage {
            values: pairs.into_iter().map(|(_, value)| value).collect(),
            last_key,
        })
    }

    /// Hides `key` from later reads by writing a tombstone.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn delete(&self, key: &[u8]) -> CoreResult<()> {
        self.delete_with_revision(key).map(|_| ())
    }

    /// Like [`RevisionedStore::delete`], returning the tombstone's revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn delete_with_revision(&self, key: &[u8]) -> CoreResult<Revision> {
        let mut session = self.begin_session()?;
        let revision = session.delete(key);
        session.commit()?;
        Ok(revision)
    }

    /// Writes `new` if the latest value equals `expected` (`None`: absent).
    ///
    /// A conflict leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is too large or the commit fails.
    pub fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> CoreResult<CasOutcome> {
        let mut session = self.begin_session()?;
        let outcome = session.compare_and_swap(key, expected, new)?;
        if outcome.is_swapped() {
            session.commit()?;
        }
        Ok(outcome)
    }

    /// Highest revision stamped so far; 0 for an empty store.
    #[must_use]
    pub fn current_revision(&self) -> Revision {
        self.manager.index().current_revision()
    }

    /// Applied-index watermark.
    #[must_use]
    pub fn applied_index(&self) -> AppliedIndex {
        self.manager.index().applied()
    }

    /// Drops every key. Revision counter and watermark are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear record cannot be written.
    pub fn clear(&self) -> CoreResult<()> {
        self.manager.clear()
    }

    /// Current counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the log size cannot be read.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        let log_size = self.manager.log().size()?;
        let index = self.manager.index();
        Ok(StoreStats {
            keys: index.key_count(),
            live_keys: index.live_key_count(),
            records: index.record_count(),
            current_revision: index.current_revision(),
            applied_index: index.applied(),
            log_size,
        })
    }
}

impl std::fmt::Debug for RevisionedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionedStore")
            .field("path", &self.path())
            .field("current_revision", &self.current_revision())
            .field("applied_index", &self.applied_index())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::LogIndex;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn scenario_put_get_cas() {
        let store = RevisionedStore::open_in_memory().unwrap();
        assert_eq!(store.put(b"a", b"v1").unwrap(), Revision::new(1));
        assert_eq!(store.put(b"a", b"v2").unwrap(), Revision::new(2));
        assert_eq!(store.get(b"a").unwrap(), Some(b"v2".to_vec()));

        assert!(store
            .compare_and_swap(b"a", Some(&b"v2"[..]), b"v3")
            .unwrap()
            .is_swapped());
        assert_eq!(store.get(b"a").unwrap(), Some(b"v3".to_vec()));

        let before = store.stats().unwrap();
        assert_eq!(
            store.compare_and_swap(b"a", Some(&b"v2"[..]), b"v4").unwrap(),
            CasOutcome::Conflict
        );
        assert_eq!(store.get(b"a").unwrap(), Some(b"v3".to_vec()));
        assert_eq!(store.stats().unwrap(), before);
    }

    #[test]
    fn cas_absent_inserts() {
        let store = RevisionedStore::open_in_memory().unwrap();
        assert_eq!(
            store.compare_and_swap(b"k", None, b"v").unwrap(),
            CasOutcome::Swapped(Revision::new(1))
        );
        assert_eq!(
            store.compare_and_swap(b"k", None, b"w").unwrap(),
            CasOutcome::Conflict
        );
    }

    #[test]
    fn empty_value_is_not_absence() {
        let store = RevisionedStore::open_in_memory().unwrap();
        store.put(b"k", b"").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(Vec::new()));
        assert_eq!(
            store.compare_and_swap(b"k", None, b"x").unwrap(),
            CasOutcome::Conflict
        );
        assert!(store
            .compare_and_swap(b"k", Some(&b""[..]), b"x")
            .unwrap()
            .is_swapped());
    }

    #[test]
    fn delete_allocates_a_revision() {
        let store = RevisionedStore::open_in_memory().unwrap();
        store.put(b"k", b"v").unwrap();
        assert_eq!(store.delete_with_revision(b"k").unwrap(), Revision::new(2));
        assert_eq!(store.current_revision(), Revision::new(2));
        assert_eq!(store.get(b"k").unwrap(), None);
        assert_eq!(store.get_at(b"k", Revision::new(1)).unwrap(), Some(b"v".to_vec()));

        store.delete(b"never-written").unwrap();
        assert_eq!(store.current_revision(), Revision::new(3));
    }

    #[test]
    fn scenario_inclusive_pagination() {
        let store = RevisionedStore::open_in_memory().unwrap();
        for i in 11..=19 {
            let key = format!("0{i}");
            store.put(key.as_bytes(), key.as_bytes()).unwrap();
        }
        let rev = store.current_revision();

        let first = store.list_bounded(b"01", b"02", 5, rev).unwrap();
        let keys: Vec<_> = first.values.iter().map(|v| String::from_utf8_lossy(v)).collect();
        assert_eq!(keys, ["011", "012", "013", "014", "015"]);
        assert_eq!(first.last_key.as_deref(), Some(&b"015"[..]));

        let second = store.list_bounded(b"015", b"02", 10, rev).unwrap();
        let keys: Vec<_> = second.values.iter().map(|v| String::from_utf8_lossy(v)).collect();
        assert_eq!(keys, ["015", "016", "017", "018", "019"]);
    }

    #[test]
    fn bounded_listing_respects_ceiling() {
        let store = RevisionedStore::open_in_memory().unwrap();
        store.put(b"a", b"old").unwrap();
        let ceiling = store.current_revision();
        store.put(b"a", b"new").unwrap();
        store.put(b"b", b"later").unwrap();

        let page = store.list_bounded(b"a", b"z", 10, ceiling).unwrap();
        assert_eq!(page.values, vec![b"old".to_vec()]);
        assert_eq!(page.last_key, Some(b"a".to_vec()));
    }

    #[test]
    fn empty_pages() {
        let store = RevisionedStore::open_in_memory().unwrap();
        store.put(b"a", b"1").unwrap();
        let rev = store.current_revision();
        assert_eq!(store.list_bounded(b"a", b"b", 0, rev).unwrap(), BoundedPage::default());
        let none = store.list_bounded(b"x", b"y", 5, rev).unwrap();
        assert!(none.values.is_empty());
        assert!(none.last_key.is_none());
    }

    #[test]
    fn list_and_pairs() {
        let store = RevisionedStore::open_in_memory().unwrap();
        store.put(b"a", b"1").unwrap();
        store.put(b"b", b"2").unwrap();
        store.put(b"c", b"3").unwrap();
        store.delete(b"b").unwrap();
        assert_eq!(store.list(b"a", b"d").unwrap(), vec![b"1".to_vec(), b"3".to_vec()]);
        assert_eq!(
            store.list_pairs(b"b", b"d").unwrap(),
            vec![(b"c".to_vec(), b"3".to_vec())]
        );
    }

    #[test]
    fn clear_keeps_revision_and_watermark() {
        let store = RevisionedStore::open_in_memory().unwrap();
        store
            .gate()
            .apply(LogIndex::new(4), |s| s.put(b"a", b"1"))
            .unwrap();
        store.clear().unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        assert_eq!(store.current_revision(), Revision::new(1));
        assert_eq!(store.applied_index().get(), Some(LogIndex::new(4)));
        assert_eq!(store.put(b"b", b"2").unwrap(), Revision::new(2));
    }

    #[test]
    fn reopen_restores_state() {
        let dir = tempdir().unwrap();
        {
            let store = RevisionedStore::open(dir.path()).unwrap();
            store.put(b"a", b"1").unwrap();
            store.delete(b"a").unwrap();
            store
                .gate()
                .apply(LogIndex::new(0), |s| s.put(b"b", b"2"))
                .unwrap();
            store.clear().unwrap();
            store.put(b"c", b"3").unwrap();
            store.close().unwrap();
        }

        let store = RevisionedStore::open(dir.path()).unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        assert_eq!(store.get(b"b").unwrap(), None);
        assert_eq!(store.get(b"c").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.current_revision(), Revision::new(4));
        assert_eq!(store.applied_index().get(), Some(LogIndex::new(0)));
        assert_eq!(store.put(b"d", b"4").unwrap(), Revision::new(5));
        assert_eq!(store.path(), Some(dir.path()));
    }

    #[test]
    fn second_open_fails_while_locked() {
        let dir = tempdir().unwrap();
        let _store = RevisionedStore::open(dir.path()).unwrap();
        assert!(matches!(
            RevisionedStore::open(dir.path()),
            Err(CoreError::StoreLocked)
        ));
    }

    #[test]
    fn session_timeout_reports_engine_unavailable() {
        let store = RevisionedStore::open_with_backend(
            Config::new().session_timeout(Duration::from_millis(20)),
            Box::new(InMemoryBackend::new()),
        )
        .unwrap();
        let _held = store.begin_session().unwrap();
        assert!(matches!(
            store.put(b"k", b"v"),
            Err(CoreError::EngineUnavailable { .. })
        ));
    }

    #[test]
    fn concurrent_puts_get_distinct_revisions() {
        let store = Arc::new(RevisionedStore::open_in_memory().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..50)
                        .map(|i| store.put(format!("{t}-{i}").as_bytes(), b"v").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<Revision> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 200);
        assert_eq!(store.current_revision(), Revision::new(200));
    }

    #[test]
    fn concurrent_cas_from_same_value_has_one_winner() {
        const THREADS: usize = 8;
        let store = Arc::new(RevisionedStore::open_in_memory().unwrap());
        store.put(b"lock", b"free").unwrap();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let owner = format!("owner-{t}");
                    store
                        .compare_and_swap(b"lock", Some(&b"free"[..]), owner.as_bytes())
                        .unwrap()
                })
            })
            .collect();

        let outcomes: Vec<CasOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = outcomes.iter().filter(|o| o.is_swapped()).count();
        assert_eq!(winners, 1);
        assert_eq!(store.current_revision(), Revision::new(2));
        let value = store.get(b"lock").unwrap().unwrap();
        assert!(value.starts_with(b"owner-"));
    }
}
