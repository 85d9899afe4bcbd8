//! Core type definitions.

use std::fmt;

/// Store-wide modification counter.
///
/// Every successful put, delete or swap is stamped with a revision higher than
/// all earlier ones. Revision 0 means "nothing written yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(pub u64);

impl Revision {
    /// The revision of an empty store.
    pub const ZERO: Self = Self(0);

    /// Creates a revision.
    #[must_use]
    pub const fn new(rev: u64) -> Self {
        Self(rev)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the following revision.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rev:{}", self.0)
    }
}

/// Position of an operation in the replication log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogIndex(pub u64);

impl LogIndex {
    /// Creates a log index.
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LogIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log:{}", self.0)
    }
}

/// Highest log index durably reflected in the store.
///
/// A fresh store is uninitialized and accepts any first index, including 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppliedIndex(Option<LogIndex>);

impl AppliedIndex {
    /// The watermark of a store that never applied anything.
    pub const UNINITIALIZED: Self = Self(None);

    /// A watermark at `index`.
    #[must_use]
    pub const fn at(index: LogIndex) -> Self {
        Self(Some(index))
    }

    /// Returns the watermark, if any.
    #[must_use]
    pub const fn get(self) -> Option<LogIndex> {
        self.0
    }

    /// Whether `index` has already been applied.
    #[must_use]
    pub fn covers(self, index: LogIndex) -> bool {
        self.0.is_some_and(|applied| index <= applied)
    }

    /// Moves the watermark forward to `index`. Never moves it back.
    pub fn advance(&mut self, index: LogIndex) {
        if !self.covers(index) {
            self.0 = Some(index);
        }
    }
}

impl fmt::Display for AppliedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(index) => write!(f, "{index}"),
            None => f.write_str("log:none"),
        }
    }
}

/// Identifier of a committed write session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxnId(pub u64);

impl TxnId {
    /// Creates a transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Result of a compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The value was written at this revision.
    Swapped(Revision),
    /// The current value did not match; nothing changed.
    Conflict,
}

impl CasOutcome {
    /// Whether the swap happened.
    #[must_use]
    pub const fn is_swapped(self) -> bool {
        matches!(self, Self::Swapped(_))
    }
}
