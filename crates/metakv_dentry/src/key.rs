//! Store keys for dentries.
//!
//! ```text
//! dentry/{fs_id}:{parent_inode_id:020}:{name}
//! ```
//!
//! The parent id is zero padded so byte order matches numeric order, and all
//! children of one directory share the prefix up to the second `:`.

use crate::dentry::Dentry;

/// Namespace shared by every dentry key.
pub const DENTRY_PREFIX: &str = "dentry/";

/// Decoded form of a dentry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DentryKey {
    /// Filesystem id.
    pub fs_id: u32,
    /// Parent directory inode.
    pub parent_inode_id: u64,
    /// Entry name.
    pub name: String,
}

impl DentryKey {
    /// Key of `dentry`.
    #[must_use]
    pub fn of(dentry: &Dentry) -> Self {
        Self {
            fs_id: dentry.fs_id,
            parent_inode_id: dentry.parent_inode_id,
            name: dentry.name.clone(),
        }
    }

    /// Store key bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut key = children_prefix(self.fs_id, self.parent_inode_id);
        key.extend_from_slice(self.name.as_bytes());
        key
    }

    /// Parses store key bytes, `None` if they are not a dentry key.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        let rest = text.strip_prefix(DENTRY_PREFIX)?;
        let mut parts = rest.splitn(3, ':');
        let fs_id = parts.next()?.parse().ok()?;
        let parent = parts.next()?;
        if parent.len() != 20 {
            return None;
        }
        let parent_inode_id = parent.parse().ok()?;
        let name = parts.next()?.to_string();
        Some(Self {
            fs_id,
            parent_inode_id,
            name,
        })
    }
}

/// Prefix shared by every child of `parent_inode_id`.
#[must_use]
pub fn children_prefix(fs_id: u32, parent_inode_id: u64) -> Vec<u8> {
    format!("{DENTRY_PREFIX}{fs_id}:{parent_inode_id:020}:").into_bytes()
}

/// Exclusive upper bound of the children of `parent_inode_id`.
///
/// `;` is the byte after `:`, so this sorts after every child key.
#[must_use]
pub fn children_end(fs_id: u32, parent_inode_id: u64) -> Vec<u8> {
    format!("{DENTRY_PREFIX}{fs_id}:{parent_inode_id:020};").into_bytes()
}

/// First key of a listing that resumes strictly after `name`.
///
/// An empty `name` starts at the first child.
#[must_use]
pub fn children_after(fs_id: u32, parent_inode_id: u64, name: &str) -> Vec<u8> {
    let mut key = children_prefix(fs_id, parent_inode_id);
    if !name.is_empty() {
        key.extend_from_slice(name.as_bytes());
        key.push(0);
    }
    key
}
