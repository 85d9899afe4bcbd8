//! # MetaKV Core
//!
//! The state-machine layer of a replicated metadata service.
//!
//! This crate provides:
//! - [`RevisionedStore`]: versioned keys with snapshot reads and compare-and-swap
//! - [`ApplyGate`]: exactly-once application of an at-least-once log
//! - [`TransactionCoordinator`]: several mutations as one atomic unit
//! - a checksummed commit log that the store is rebuilt from on open
//!
//! ## Layering
//!
//! ```text
//! ApplyGate / TransactionCoordinator
//!         │  one Session per call
//!         ▼
//! RevisionedStore ── MvccIndex (readers)
//!         │
//!         ▼
//! CommitLog ── StorageBackend (metakv_storage)
//! ```
//!
//! Reads go straight to the index and never touch the gate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod apply;
mod config;
mod coordinator;
mod dir;
mod error;
mod index;
mod store;
mod transaction;
mod types;
pub mod wal;

pub use apply::{Applied, ApplyGate};
pub use config::Config;
pub use coordinator::{Mutation, TransactionCoordinator};
pub use dir::StoreDir;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use index::MvccIndex;
pub use store::{BoundedPage, RevisionedStore, StoreStats};
pub use transaction::Session;
pub use types::{AppliedIndex, CasOutcome, LogIndex, Revision, TxnId};

/// Crate version, printed by `metakv version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
