//! Write sessions.
//!
//! A store has one writer at a time. A [`Session`] holds that role for its
//! lifetime:
//!
//! - reads inside the session see its own pending writes
//! - [`Session::commit`] writes one commit record, then publishes every write
//!   to readers in one step
//! - dropping the session without committing discards everything

mod manager;
mod session;

pub(crate) use manager::SessionManager;
pub use session::Session;
