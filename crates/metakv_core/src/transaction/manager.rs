//! Session manager: the single writer, the commit path and recovery.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::MvccIndex;
use crate::transaction::session::Session;
use crate::types::{LogIndex, Revision, TxnId};
use crate::wal::{CommitLog, LogOp, LogRecord, ReplaySummary};
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Owns the commit log and the index, and serializes writers.
///
/// Only one [`Session`] exists at a time. Revisions are reserved inside the
/// session from the committed counter, and the counter only moves when the
/// session's commit record is durable, so no two commits can share one.
pub(crate) struct SessionManager {
    log: CommitLog,
    index: RwLock<MvccIndex>,
    writer: Mutex<()>,
    next_txid: AtomicU64,
    session_timeout: Option<Duration>,
    max_value_size: usize,
}

impl SessionManager {
    /// Rebuilds the index by replaying `log`.
    pub(crate) fn recover(log: CommitLog, config: &Config) -> CoreResult<(Self, ReplaySummary)> {
        let mut index = MvccIndex::new();
        let mut max_txid = 0;
        let summary = log.replay(|_, record| {
            max_txid = max_txid.max(record.txid().as_u64());
            match record {
                LogRecord::Commit { applied, ops, .. } => index.apply(&ops, applied),
                LogRecord::Clear { .. } => {
                    index.clear();
                    Ok(())
                }
            }
        })?;

        info!(
            records = summary.records,
            keys = index.key_count(),
            revision = %index.current_revision(),
            applied = %index.applied(),
            "commit log replayed"
        );

        let manager = Self {
            log,
            index: RwLock::new(index),
            writer: Mutex::new(()),
            next_txid: AtomicU64::new(max_txid + 1),
            session_timeout: config.session_timeout,
            max_value_size: config.max_value_size,
        };
        Ok((manager, summary))
    }

    /// Opens a write session, waiting for the current writer to finish.
    pub(crate) fn begin(&self) -> CoreResult<Session<'_>> {
        let guard = self.lock_writer()?;
        let txid = TxnId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let committed = self.index.read().current_revision();
        debug!(%txid, base = %committed, "session started");
        Ok(Session::new(self, guard, txid, committed.next()))
    }

    fn lock_writer(&self) -> CoreResult<MutexGuard<'_, ()>> {
        match self.session_timeout {
            Some(timeout) => self.writer.try_lock_for(timeout).ok_or_else(|| {
                CoreError::engine_unavailable(format!(
                    "timed out after {timeout:?} waiting for the write session"
                ))
            }),
            None => Ok(self.writer.lock()),
        }
    }

    /// Makes a session's ops durable, then publishes them to readers.
    ///
    /// Must be called with the writer lock held.
    pub(crate) fn publish(
        &self,
        txid: TxnId,
        applied: Option<LogIndex>,
        ops: Vec<LogOp>,
    ) -> CoreResult<Revision> {
        let record = LogRecord::Commit { txid, applied, ops };
        self.log.append(&record)?;

        let mut index = self.index.write();
        if let LogRecord::Commit { applied, ops, .. } = &record {
            index.apply(ops, *applied)?;
        }
        Ok(index.current_revision())
    }

    /// Drops all key data under the writer lock.
    pub(crate) fn clear(&self) -> CoreResult<()> {
        let _guard = self.lock_writer()?;
        let txid = TxnId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        self.log.append(&LogRecord::Clear { txid })?;

        let mut index = self.index.write();
        let dropped = index.key_count();
        index.clear();
        info!(%txid, dropped, "store cleared");
        Ok(())
    }

    pub(crate) fn index(&self) -> RwLockReadGuard<'_, MvccIndex> {
        self.index.read()
    }

    pub(crate) fn log(&self) -> &CommitLog {
        &self.log
    }

    pub(crate) fn max_value_size(&self) -> usize {
        self.max_value_size
    }
}
