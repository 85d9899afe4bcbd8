//! CLI command implementations.

pub mod dump_log;
pub mod inspect;
pub mod read;
pub mod verify;

use metakv_core::{Config, RevisionedStore};
use std::path::Path;
use tracing::info;

/// Opens an existing store without creating anything.
pub(crate) fn open_existing(path: &Path) -> Result<RevisionedStore, Box<dyn std::error::Error>> {
    if !path.join("commit.log").exists() {
        return Err(format!("No store found at {}", path.display()).into());
    }
    info!("Opening store at {:?}", path);
    Ok(RevisionedStore::open_with_config(
        path,
        Config::new().create_if_missing(false),
    )?)
}
