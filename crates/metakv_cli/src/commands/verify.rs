//! Verify command implementation.

use metakv_core::wal::CommitLog;
use metakv_storage::FileBackend;
use std::path::Path;
use tracing::info;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of complete, checksummed records.
    pub valid_records: u64,
    /// End of the last valid record.
    pub valid_end: u64,
    /// Bytes of an incomplete trailing record, dropped on the next open.
    pub torn_bytes: u64,
    /// First corruption found, if any.
    pub error: Option<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying store at {}", path.display());
    println!();

    let log_path = path.join("commit.log");
    if !log_path.exists() {
        println!("Commit log not found (this may be normal for new stores)");
        return Ok(());
    }

    info!("Verifying commit log {:?}", log_path);
    let log = CommitLog::new(Box::new(FileBackend::open(&log_path)?), false);
    let result = verify_log(&log)?;
    print_result(&result);

    println!();
    if result.is_ok() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}

fn verify_log(log: &CommitLog) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();
    let mut iter = log.iter()?;

    for item in iter.by_ref() {
        match item {
            Ok(_) => result.valid_records += 1,
            Err(err) => {
                result.error = Some(err.to_string());
                break;
            }
        }
    }

    result.valid_end = iter.valid_end();
    if result.is_ok() {
        result.torn_bytes = iter.total_size() - result.valid_end;
    }
    Ok(result)
}

fn print_result(result: &VerifyResult) {
    println!("Commit log:");
    println!("  Valid records: {}", result.valid_records);
    println!("  Valid bytes:   {}", result.valid_end);
    if result.torn_bytes > 0 {
        println!(
            "  Torn tail:     {} bytes (discarded on next open)",
            result.torn_bytes
        );
    }
    if let Some(error) = &result.error {
        println!("  Error at offset {}: {}", result.valid_end, error);
    }
}
