//! In-memory multi-version index rebuilt from the commit log.

use crate::error::{render_key, CoreError, CoreResult};
use crate::types::{AppliedIndex, LogIndex, Revision};
use crate::wal::LogOp;
use std::collections::BTreeMap;
use std::ops::Bound;

/// One version of a key. `value == None` is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Version {
    revision: Revision,
    value: Option<Vec<u8>>,
}

/// Every version of every key, plus the counters published with them.
///
/// Versions of a key are kept in ascending revision order. Nothing is ever
/// removed except by [`MvccIndex::clear`]. A delete of a key that has no
/// live version still moves the revision but adds no tombstone.
#[derive(Debug, Default)]
pub struct MvccIndex {
    entries: BTreeMap<Vec<u8>, Vec<Version>>,
    current_revision: Revision,
    applied: AppliedIndex,
    records: u64,
}

impl MvccIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest revision ever stamped.
    #[must_use]
    pub fn current_revision(&self) -> Revision {
        self.current_revision
    }

    /// Applied-index watermark.
    #[must_use]
    pub fn applied(&self) -> AppliedIndex {
        self.applied
    }

    /// Value of `key` as of `ceiling`.
    #[must_use]
    pub fn get_at(&self, key: &[u8], ceiling: Revision) -> Option<&[u8]> {
        visible(self.entries.get(key)?, ceiling)
    }

    /// Latest value of `key`.
    #[must_use]
    pub fn latest(&self, key: &[u8]) -> Option<&[u8]> {
        self.get_at(key, self.current_revision)
    }

    /// Live `(key, value)` pairs in `[start, end)` as of `ceiling`, in key
    /// order, at most `limit` of them when given.
    #[must_use]
    pub fn range(
        &self,
        start: &[u8],
        end: &[u8],
        ceiling: Revision,
        limit: Option<usize>,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        if start >= end {
            return Vec::new();
        }
        let bounds = (Bound::Included(start), Bound::Excluded(end));
        let live = self
            .entries
            .range::<[u8], _>(bounds)
            .filter_map(|(key, versions)| {
                visible(versions, ceiling).map(|value| (key.clone(), value.to_vec()))
            });
        match limit {
            Some(limit) => live.take(limit).collect(),
            None => live.collect(),
        }
    }

    /// Applies committed ops and the watermark they carry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LogCorruption`] if an op's revision does not
    /// exceed the current revision.
    pub fn apply(&mut self, ops: &[LogOp], applied: Option<LogIndex>) -> CoreResult<()> {
        let mut last = self.current_revision;
        for op in ops {
            let revision = op.revision();
            if revision <= last {
                return Err(CoreError::log_corruption(format!(
                    "{revision} on key {} does not follow {last}",
                    render_key(op.key()),
                )));
            }
            last = revision;
        }

        for op in ops {
            self.current_revision = self.current_revision.max(op.revision());
            match op {
                LogOp::Put {
                    key,
                    value,
                    revision,
                } => {
                    self.entries.entry(key.clone()).or_default().push(Version {
                        revision: *revision,
                        value: Some(value.clone()),
                    });
                    self.records += 1;
                }
                LogOp::Delete { key, revision } => {
                    // A key with no live version needs no tombstone.
                    let Some(versions) = self.entries.get_mut(key.as_slice()) else {
                        continue;
                    };
                    if versions.last().is_some_and(|v| v.value.is_some()) {
                        versions.push(Version {
                            revision: *revision,
                            value: None,
                        });
                        self.records += 1;
                    }
                }
            }
        }

        if let Some(index) = applied {
            self.applied.advance(index);
        }
        Ok(())
    }

    /// Drops every key. The revision counter and the watermark stay.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.records = 0;
    }

    /// Number of keys with at least one version.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of keys whose latest version is not a tombstone.
    #[must_use]
    pub fn live_key_count(&self) -> usize {
        self.entries
            .values()
            .filter(|versions| versions.last().is_some_and(|v| v.value.is_some()))
            .count()
    }

    /// Number of versions held, tombstones included.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.records
    }
}

fn visible(versions: &[Version], ceiling: Revision) -> Option<&[u8]> {
    versions
        .iter()
        .rev()
        .find(|v| v.revision <= ceiling)
        .and_then(|v| v.value.as_deref())
}
