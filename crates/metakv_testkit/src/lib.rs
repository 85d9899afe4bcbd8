//! # MetaKV Testkit
//!
//! Test utilities for MetaKV.
//!
//! This crate provides:
//! - Store fixtures backed by memory or a temporary directory
//! - Property-based test generators using proptest
//! - A fault-injecting storage backend for failure and crash tests
//!
//! ## Usage
//!
//! ```rust
//! use metakv_testkit::prelude::*;
//!
//! with_memory_store(|store| {
//!     store.put(b"k", b"v").unwrap();
//!     assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fault;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fault::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fault::*;
pub use fixtures::*;
pub use generators::*;
