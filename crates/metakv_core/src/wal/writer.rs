//! Commit log writer.

use crate::error::{CoreError, CoreResult};
use crate::wal::iterator::LogIterator;
use crate::wal::record::LogRecord;
use metakv_storage::StorageBackend;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

/// What a full pass over the log found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    /// Complete records read.
    pub records: u64,
    /// End of the last complete record.
    pub valid_end: u64,
    /// Bytes after `valid_end` that were discarded.
    pub torn_bytes: u64,
}

/// Append-only log of committed sessions on a [`StorageBackend`].
pub struct CommitLog {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
    poisoned: AtomicBool,
}

impl CommitLog {
    /// Wraps a backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
            poisoned: AtomicBool::new(false),
        }
    }

    /// Appends a record and makes it durable. Returns its offset.
    ///
    /// If any step fails the backend is truncated back to where it was, so a
    /// half-written record can never hide later commits. If that truncate
    /// fails too, the log is poisoned and refuses every later append.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding, writing or syncing fails, or
    /// [`CoreError::EngineUnavailable`] once the log is poisoned.
    pub fn append(&self, record: &LogRecord) -> CoreResult<u64> {
        let data = record.encode()?;
        let mut backend = self.backend.lock();
        if self.is_poisoned() {
            return Err(CoreError::engine_unavailable(
                "commit log holds an unremovable partial record; reopen the store",
            ));
        }
        let start = backend.size()?;

        let written = backend.append(&data).and_then(|offset| {
            if self.sync_on_commit {
                backend.sync()?;
            } else {
                backend.flush()?;
            }
            Ok(offset)
        });

        match written {
            Ok(offset) => Ok(offset),
            Err(err) => {
                error!(
                    txid = %record.txid(),
                    offset = start,
                    error = %err,
                    "commit log append failed"
                );
                if let Err(truncate_err) = backend.truncate(start) {
                    self.poisoned.store(true, Ordering::SeqCst);
                    error!(
                        offset = start,
                        error = %truncate_err,
                        "failed to discard partial commit record, commit log poisoned"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Whether a failed append left bytes that could not be removed.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    /// Forces everything appended so far to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&self) -> CoreResult<()> {
        self.backend.lock().sync()?;
        Ok(())
    }

    /// Current log size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size cannot be read.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Streams records from the start. Holds the log lock while alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be accessed.
    pub fn iter(&self) -> CoreResult<LogIterator<'_>> {
        LogIterator::new(self.backend.lock(), 0)
    }

    /// Feeds every complete record to `apply`, then drops a torn tail.
    ///
    /// # Errors
    ///
    /// Returns the first corruption, backend or callback error.
    pub fn replay<F>(&self, mut apply: F) -> CoreResult<ReplaySummary>
    where
        F: FnMut(u64, LogRecord) -> CoreResult<()>,
    {
        let mut iter = self.iter()?;
        let mut records = 0;
        for item in iter.by_ref() {
            let (offset, record) = item?;
            apply(offset, record)?;
            records += 1;
        }

        let valid_end = iter.valid_end();
        let torn_bytes = iter.total_size() - valid_end;
        if torn_bytes > 0 {
            warn!(valid_end, torn_bytes, "discarding torn commit log tail");
            iter.into_backend().truncate(valid_end)?;
        }

        Ok(ReplaySummary {
            records,
            valid_end,
            torn_bytes,
        })
    }
}
