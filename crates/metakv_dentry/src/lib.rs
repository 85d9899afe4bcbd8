//! # MetaKV Dentry
//!
//! Directory-entry bookkeeping for a distributed filesystem's metadata
//! server, stored in a [`metakv_core::RevisionedStore`].
//!
//! Each name in a directory maps to one store key holding a CBOR-encoded
//! [`DentryVec`]: every version of that name, ordered by transaction id.
//! Readers resolve a name at a transaction id; renames move names between
//! directories in a single coordinated transaction.
//!
//! [`DentryManager`] is the request-facing surface and reports a
//! [`MetaStatusCode`] for every operation.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dentry;
mod key;
mod manager;
mod status;
mod storage;
mod tx;

pub use dentry::{CodecError, Dentry, DentryFlags, DentryVec, FileType};
pub use key::{children_after, children_end, children_prefix, DentryKey, DENTRY_PREFIX};
pub use manager::DentryManager;
pub use status::MetaStatusCode;
pub use storage::DentryStorage;
pub use tx::TxManager;
