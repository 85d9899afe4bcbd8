//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use metakv_core::{Config, LogIndex, RevisionedStore};
use metakv_dentry::DentryManager;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Arc<RevisionedStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(
                RevisionedStore::open_in_memory().expect("Failed to open in-memory store"),
            ),
            _temp_dir: None,
        }
    }

    /// Creates a new file-based test store in a temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a file-based test store with `config`.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RevisionedStore::open_with_config(&temp_dir.path().join("store"), config)
            .expect("Failed to open file store");
        Self {
            store: Arc::new(store),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("store"))
    }

    /// Closes and reopens a file-based store, replaying its commit log.
    ///
    /// Every other handle to the store must be dropped first, since the
    /// directory lock is only released with the last one.
    pub fn reopen(self) -> Self {
        let Self { store, _temp_dir } = self;
        let temp_dir = _temp_dir.expect("Only file stores can be reopened");
        drop(store);
        let store = RevisionedStore::open(&temp_dir.path().join("store"))
            .expect("Failed to reopen file store");
        Self {
            store: Arc::new(store),
            _temp_dir: Some(temp_dir),
        }
    }

    /// A dentry manager sharing this store.
    pub fn dentry_manager(&self) -> DentryManager {
        DentryManager::new(Arc::clone(&self.store))
    }
}

impl std::ops::Deref for TestStore {
    type Target = RevisionedStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use metakv_testkit::with_memory_store;
///
/// with_memory_store(|store| {
///     store.put(b"a", b"1").unwrap();
/// });
/// ```
pub fn with_memory_store<F, R>(f: F) -> R
where
    F: FnOnce(&RevisionedStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a temporary file-based store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&RevisionedStore, &Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a store with `key_count` keys `key-00000`.. applied at log
    /// indices 1..=`key_count`.
    pub fn populated_store(key_count: usize) -> TestStore {
        let test_store = TestStore::memory();
        let gate = test_store.gate();
        for i in 0..key_count {
            gate.put(
                LogIndex::new(i as u64 + 1),
                format!("key-{i:05}").as_bytes(),
                format!("value-{i}").as_bytes(),
            )
            .expect("Failed to put key");
        }
        test_store
    }
}
