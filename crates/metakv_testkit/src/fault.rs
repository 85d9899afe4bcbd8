//! Fault injection for the commit log's storage backend.
//!
//! [`FaultyBackend`] wraps any [`StorageBackend`] and consults a shared
//! [`FaultController`] before each call, so a test can keep a handle to the
//! controller after the backend has been moved into a store.
//!
//! ## Usage
//!
//! ```rust
//! use metakv_core::{Config, RevisionedStore};
//! use metakv_storage::InMemoryBackend;
//! use metakv_testkit::FaultyBackend;
//!
//! let (backend, faults) = FaultyBackend::new(Box::new(InMemoryBackend::new()));
//! let store = RevisionedStore::open_with_backend(Config::default(), Box::new(backend)).unwrap();
//!
//! faults.fail_appends(true);
//! assert!(store.put(b"k", b"v").is_err());
//! faults.reset();
//! assert!(store.put(b"k", b"v").is_ok());
//! ```

use metakv_storage::{StorageBackend, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

const NO_TEAR: u64 = u64::MAX;

/// Switches shared between a test and its [`FaultyBackend`].
#[derive(Debug)]
pub struct FaultController {
    fail_append: AtomicBool,
    fail_sync: AtomicBool,
    fail_truncate: AtomicBool,
    tear_after: AtomicU64,
    appends: AtomicU64,
    injected: AtomicU64,
}

impl Default for FaultController {
    fn default() -> Self {
        Self {
            fail_append: AtomicBool::new(false),
            fail_sync: AtomicBool::new(false),
            fail_truncate: AtomicBool::new(false),
            tear_after: AtomicU64::new(NO_TEAR),
            appends: AtomicU64::new(0),
            injected: AtomicU64::new(0),
        }
    }
}

impl FaultController {
    /// Makes every append fail without writing.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_append.store(fail, Ordering::SeqCst);
    }

    /// Makes `flush` and `sync` fail after the bytes were appended.
    pub fn fail_syncs(&self, fail: bool) {
        self.fail_sync.store(fail, Ordering::SeqCst);
    }

    /// Makes `truncate` fail, so a failed append leaves its bytes behind.
    pub fn fail_truncates(&self, fail: bool) {
        self.fail_truncate.store(fail, Ordering::SeqCst);
    }

    /// The next append writes only its first `bytes` bytes, then fails.
    pub fn tear_next_append(&self, bytes: u64) {
        self.tear_after.store(bytes, Ordering::SeqCst);
    }

    /// Clears every fault.
    pub fn reset(&self) {
        self.fail_append.store(false, Ordering::SeqCst);
        self.fail_sync.store(false, Ordering::SeqCst);
        self.fail_truncate.store(false, Ordering::SeqCst);
        self.tear_after.store(NO_TEAR, Ordering::SeqCst);
    }

    /// Appends attempted so far.
    pub fn appends(&self) -> u64 {
        self.appends.load(Ordering::SeqCst)
    }

    /// Faults injected so far.
    pub fn injected(&self) -> u64 {
        self.injected.load(Ordering::SeqCst)
    }

    fn inject(&self, what: &str) -> StorageError {
        self.injected.fetch_add(1, Ordering::SeqCst);
        StorageError::Unavailable(format!("injected {what} failure"))
    }
}

/// A storage backend wrapper that fails on command.
pub struct FaultyBackend {
    inner: Box<dyn StorageBackend>,
    faults: Arc<FaultController>,
}

impl FaultyBackend {
    /// Wraps `inner` and returns the controller for it.
    pub fn new(inner: Box<dyn StorageBackend>) -> (Self, Arc<FaultController>) {
        let faults = Arc::new(FaultController::default());
        let backend = Self {
            inner,
            faults: Arc::clone(&faults),
        };
        (backend, faults)
    }
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.faults.appends.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_append.load(Ordering::SeqCst) {
            return Err(self.faults.inject("append"));
        }

        let tear = self.faults.tear_after.swap(NO_TEAR, Ordering::SeqCst);
        if tear != NO_TEAR {
            let kept = usize::try_from(tear).map_or(data.len(), |t| t.min(data.len()));
            self.inner.append(&data[..kept])?;
            return Err(self.faults.inject("torn append"));
        }

        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.faults.fail_sync.load(Ordering::SeqCst) {
            return Err(self.faults.inject("flush"));
        }
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.faults.fail_sync.load(Ordering::SeqCst) {
            return Err(self.faults.inject("sync"));
        }
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if self.faults.fail_truncate.load(Ordering::SeqCst) {
            return Err(self.faults.inject("truncate"));
        }
        self.inner.truncate(new_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metakv_storage::InMemoryBackend;

    #[test]
    fn test_torn_append_keeps_prefix() {
        let (mut backend, faults) = FaultyBackend::new(Box::new(InMemoryBackend::new()));
        backend.append(b"abc").unwrap();
        faults.tear_next_append(2);
        assert!(matches!(
            backend.append(b"defg"),
            Err(StorageError::Unavailable(_))
        ));
        assert_eq!(backend.size().unwrap(), 5);
        // The tear applies to one append only.
        backend.append(b"h").unwrap();
        assert_eq!(backend.read_at(0, 6).unwrap(), b"abcdeh");
        assert_eq!(faults.appends(), 3);
        assert_eq!(faults.injected(), 1);
    }

    #[test]
    fn test_reset_clears_faults() {
        let (mut backend, faults) = FaultyBackend::new(Box::new(InMemoryBackend::new()));
        faults.fail_appends(true);
        faults.fail_syncs(true);
        assert!(backend.append(b"x").is_err());
        assert!(backend.sync().is_err());
        faults.reset();
        assert!(backend.append(b"x").is_ok());
        assert!(backend.sync().is_ok());
    }
}
