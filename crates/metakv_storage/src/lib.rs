//! # MetaKV Storage
//!
//! The byte-oriented persistence layer underneath the MetaKV commit log.
//!
//! A backend is a single growable byte region. It knows nothing about
//! commit records, revisions or keys; `metakv_core` frames and checksums
//! everything it writes here.
//!
//! ## Contract
//!
//! - `append` only ever grows the region and returns the offset it wrote at
//! - `truncate` is the only way to shrink it (used to drop a torn tail)
//! - `flush` hands data to the OS, `sync` makes it survive power loss
//! - Backends are `Send + Sync` so a store can be shared between threads
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral stores and tests
//! - [`FileBackend`] - a single file on the local filesystem
//!
//! ## Example
//!
//! ```rust
//! use metakv_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let at = backend.append(b"commit").unwrap();
//! assert_eq!(backend.read_at(at, 6).unwrap(), b"commit");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
