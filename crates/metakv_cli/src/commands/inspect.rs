//! Inspect command implementation.

use super::open_existing;
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Commit log size in bytes.
    pub log_size: u64,
    /// Versions held, tombstones included.
    pub versions: u64,
    /// Keys with any history.
    pub keys: usize,
    /// Keys whose latest version is live.
    pub live_keys: usize,
    /// Keys whose latest version is a tombstone.
    pub tombstones: usize,
    /// Highest committed revision.
    pub current_revision: u64,
    /// Highest applied replication log index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_index: Option<u64>,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let stats = store.stats()?;

    let result = InspectResult {
        path: path.display().to_string(),
        log_size: stats.log_size,
        versions: stats.records,
        keys: stats.keys,
        live_keys: stats.live_keys,
        tombstones: stats.keys - stats.live_keys,
        current_revision: stats.current_revision.as_u64(),
        applied_index: stats.applied_index.get().map(|index| index.as_u64()),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("MetaKV Store Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Commit log:");
    println!("  Size:          {}", format_size(result.log_size));
    println!();
    println!("Keys:");
    println!("  Total:         {}", result.keys);
    println!("  Live:          {}", result.live_keys);
    println!("  Tombstones:    {}", result.tombstones);
    println!("  Versions:      {}", result.versions);
    println!();
    println!("Revision:        {}", result.current_revision);
    match result.applied_index {
        Some(index) => println!("Applied index:   {index}"),
        None => println!("Applied index:   none"),
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
