//! Get and list command implementations.

use super::open_existing;
use metakv_core::{Revision, RevisionedStore};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// A key-value pair for output.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct KeyValue {
    /// Key, lossily decoded as UTF-8.
    pub key: String,
    /// Value, lossily decoded as UTF-8.
    pub value: String,
}

/// Runs the get command.
pub fn get(
    path: &Path,
    key: &str,
    revision: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    info!("Reading key {:?} at revision {:?}", key, revision);
    let value = match revision {
        Some(rev) => store.get_at(key.as_bytes(), Revision::new(rev))?,
        None => store.get(key.as_bytes())?,
    };
    match value {
        Some(value) => {
            println!("{}", String::from_utf8_lossy(&value));
            Ok(())
        }
        None => Err(format!("Key not found: {key}").into()),
    }
}

/// Runs the list command.
pub fn list(
    path: &Path,
    start: &str,
    end: &str,
    limit: Option<usize>,
    revision: Option<u64>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    info!("Listing keys in [{:?}, {:?})", start, end);
    let pairs = collect_pairs(&store, start, end, limit, revision)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&pairs)?);
        }
        _ => {
            for pair in &pairs {
                println!("{} = {}", pair.key, pair.value);
            }
            println!();
            println!("{} keys", pairs.len());
        }
    }

    Ok(())
}

fn collect_pairs(
    store: &RevisionedStore,
    start: &str,
    end: &str,
    limit: Option<usize>,
    revision: Option<u64>,
) -> Result<Vec<KeyValue>, Box<dyn std::error::Error>> {
    let ceiling = revision.map_or_else(|| store.current_revision(), Revision::new);
    let pairs = store.list_pairs_at(start.as_bytes(), end.as_bytes(), ceiling)?;
    Ok(pairs
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(key, value)| KeyValue {
            key: String::from_utf8_lossy(&key).into_owned(),
            value: String::from_utf8_lossy(&value).into_owned(),
        })
        .collect())
}
