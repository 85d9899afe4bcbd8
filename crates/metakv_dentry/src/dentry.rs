//! Directory entries and the per-key entry vector.

use metakv_core::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use thiserror::Error;

/// Kind of object a dentry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// A directory.
    Directory,
    /// A regular file.
    File,
    /// A symbolic link.
    SymLink,
}

/// Flag bits carried by a dentry version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DentryFlags(u32);

impl DentryFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// This version records the removal of the name.
    pub const DELETE_MARK: Self = Self(1);
    /// Written by a prepared rename.
    pub const TRANSACTION_PREPARE: Self = Self(1 << 1);

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DentryFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A name inside a parent directory, at one transaction version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dentry {
    /// Filesystem the entry belongs to.
    pub fs_id: u32,
    /// Inode of the containing directory.
    pub parent_inode_id: u64,
    /// Name within the parent.
    pub name: String,
    /// Inode the name resolves to.
    pub inode_id: u64,
    /// Transaction version of this entry.
    pub tx_id: u64,
    /// Kind of the target.
    pub file_type: FileType,
    /// Version flags.
    pub flags: DentryFlags,
}

impl Dentry {
    /// Creates an unflagged dentry.
    pub fn new(
        fs_id: u32,
        parent_inode_id: u64,
        name: impl Into<String>,
        inode_id: u64,
        tx_id: u64,
        file_type: FileType,
    ) -> Self {
        Self {
            fs_id,
            parent_inode_id,
            name: name.into(),
            inode_id,
            tx_id,
            file_type,
            flags: DentryFlags::NONE,
        }
    }

    /// Returns the dentry with `flags` added.
    #[must_use]
    pub fn with_flags(mut self, flags: DentryFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    /// Whether this version marks the name as removed.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.flags.contains(DentryFlags::DELETE_MARK)
    }

    /// Whether the target is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Whether `self` and `other` name the same key.
    #[must_use]
    pub fn same_key(&self, other: &Self) -> bool {
        self.fs_id == other.fs_id
            && self.parent_inode_id == other.parent_inode_id
            && self.name == other.name
    }
}

impl fmt::Display for Dentry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fsId: {} parentInodeId: {} name: \"{}\" inodeId: {} txId: {} type: {:?} flag: {}",
            self.fs_id,
            self.parent_inode_id,
            self.name,
            self.inode_id,
            self.tx_id,
            self.file_type,
            self.flags.bits()
        )
    }
}

/// Failure to encode or decode a [`DentryVec`].
#[derive(Debug, Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("failed to encode dentry vector: {0}")]
    Encode(String),
    /// Stored bytes are not a dentry vector.
    #[error("failed to decode dentry vector: {0}")]
    Decode(String),
}

impl From<CodecError> for CoreError {
    fn from(err: CodecError) -> Self {
        Self::engine_unavailable(err.to_string())
    }
}

/// Every version stored under one dentry key, ascending by `tx_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DentryVec {
    /// Versions, one per `tx_id`.
    pub dentries: Vec<Dentry>,
}

impl DentryVec {
    /// Creates an empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes as CBOR.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the bytes are not a dentry vector.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        ciborium::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// Whether no versions remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dentries.is_empty()
    }

    /// Number of versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dentries.len()
    }

    /// The version with exactly `tx_id`.
    #[must_use]
    pub fn find(&self, tx_id: u64) -> Option<&Dentry> {
        self.position(tx_id).ok().map(|i| &self.dentries[i])
    }

    /// The newest version visible to a reader at `tx_id`.
    #[must_use]
    pub fn visible_at(&self, tx_id: u64) -> Option<&Dentry> {
        self.dentries.iter().rev().find(|d| d.tx_id <= tx_id)
    }

    /// Replaces the version with the same `tx_id`, or inserts in order.
    pub fn upsert(&mut self, dentry: Dentry) {
        match self.position(dentry.tx_id) {
            Ok(i) => self.dentries[i] = dentry,
            Err(i) => self.dentries.insert(i, dentry),
        }
    }

    /// Removes and returns the version with `tx_id`.
    pub fn remove(&mut self, tx_id: u64) -> Option<Dentry> {
        self.position(tx_id).ok().map(|i| self.dentries.remove(i))
    }

    fn position(&self, tx_id: u64) -> Result<usize, usize> {
        self.dentries.binary_search_by_key(&tx_id, |d| d.tx_id)
    }
}

impl FromIterator<Dentry> for DentryVec {
    fn from_iter<I: IntoIterator<Item = Dentry>>(iter: I) -> Self {
        let mut vec = Self::new();
        for dentry in iter {
            vec.upsert(dentry);
        }
        vec
    }
}
