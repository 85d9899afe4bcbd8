//! Dump-log command implementation.

use metakv_core::wal::{CommitLog, LogOp, LogRecord};
use metakv_storage::FileBackend;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Commit log record representation for output.
#[derive(Debug, Serialize)]
pub struct LogRecordInfo {
    /// Offset in the commit log.
    pub offset: u64,
    /// Record type.
    pub record_type: String,
    /// Session id.
    pub txid: u64,
    /// Replication log index applied by this record (if gated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<u64>,
    /// Mutations carried (commit records only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ops: Vec<LogOpInfo>,
}

/// One mutation inside a commit record.
#[derive(Debug, Serialize)]
pub struct LogOpInfo {
    /// `PUT` or `DELETE`.
    pub op: &'static str,
    /// Revision stamped on the mutation.
    pub revision: u64,
    /// Key, lossily decoded as UTF-8.
    pub key: String,
    /// Value size in bytes (puts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_size: Option<usize>,
}

impl From<&LogOp> for LogOpInfo {
    fn from(op: &LogOp) -> Self {
        let (name, value_size) = match op {
            LogOp::Put { value, .. } => ("PUT", Some(value.len())),
            LogOp::Delete { .. } => ("DELETE", None),
        };
        Self {
            op: name,
            revision: op.revision().as_u64(),
            key: String::from_utf8_lossy(op.key()).into_owned(),
            value_size,
        }
    }
}

impl LogRecordInfo {
    fn new(offset: u64, record: &LogRecord) -> Self {
        match record {
            LogRecord::Commit { txid, applied, ops } => Self {
                offset,
                record_type: "COMMIT".to_string(),
                txid: txid.as_u64(),
                applied: applied.map(|index| index.as_u64()),
                ops: ops.iter().map(LogOpInfo::from).collect(),
            },
            LogRecord::Clear { txid } => Self {
                offset,
                record_type: "CLEAR".to_string(),
                txid: txid.as_u64(),
                applied: None,
                ops: Vec::new(),
            },
        }
    }
}

/// Runs the dump-log command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    start_offset: u64,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_path = path.join("commit.log");

    if !log_path.exists() {
        return Err("Commit log not found".into());
    }

    info!("Dumping commit log {:?} from offset {}", log_path, start_offset);
    let log = CommitLog::new(Box::new(FileBackend::open(&log_path)?), false);
    let records = read_log_records(&log, start_offset, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
        }
    }

    Ok(())
}

fn read_log_records(
    log: &CommitLog,
    start_offset: u64,
    limit: Option<usize>,
) -> Result<Vec<LogRecordInfo>, Box<dyn std::error::Error>> {
    let max_records = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();

    for item in log.iter()? {
        if records.len() >= max_records {
            break;
        }
        let (offset, record) = item?;
        if offset < start_offset {
            continue;
        }
        records.push(LogRecordInfo::new(offset, &record));
    }

    Ok(records)
}

fn print_text_output(records: &[LogRecordInfo]) {
    println!("Commit Log Records ({} total)", records.len());
    println!("=========================");
    println!();

    for record in records {
        print!("[{:08}] {:7} txid={}", record.offset, record.record_type, record.txid);
        if let Some(applied) = record.applied {
            print!(" applied={}", applied);
        }
        println!();
        for op in &record.ops {
            print!("    {:6} rev={} key={:?}", op.op, op.revision, op.key);
            if let Some(size) = op.value_size {
                print!(" value_size={}", size);
            }
            println!();
        }
    }
}
