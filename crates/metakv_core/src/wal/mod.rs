//! Commit log: the durability primitive behind every write session.
//!
//! ## Record Format
//!
//! ```text
//! | magic "MKVL" (4) | version (2) | type (1) | length (4) | header crc32 (4) |
//! | payload (N) | crc32 (4) |
//! ```
//!
//! All integers are little endian. The header CRC covers the eleven bytes
//! before it, so a damaged length is caught before it is trusted. The
//! trailing CRC covers header and payload.
//!
//! A committed session is exactly one `Commit` record holding its ops, the
//! revisions stamped on them and the applied log index it advances to.
//! There are no separate begin/commit markers: a record is in the log or it
//! is not.
//!
//! ## Recovery Policy
//!
//! Tolerated, treated as end of log and truncated away:
//!
//! - fewer than 15 header bytes left
//! - a checksummed header whose payload runs past the end
//!
//! Fatal, the store refuses to open:
//!
//! - header or record CRC mismatch
//! - bad magic
//! - unknown record type
//! - unsupported version
//! - a payload that does not decode

mod iterator;
mod record;
mod writer;

pub use iterator::LogIterator;
pub use record::{LogOp, LogRecord, LogRecordType, LOG_MAGIC, LOG_VERSION};
pub use writer::{CommitLog, ReplaySummary};
