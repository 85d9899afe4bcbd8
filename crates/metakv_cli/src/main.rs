//! MetaKV CLI
//!
//! Command-line tools for offline MetaKV store maintenance.
//!
//! # Commands
//!
//! - `inspect` - Display store statistics and the applied watermark
//! - `verify` - Verify commit log integrity
//! - `dump-log` - Dump commit log records for debugging
//! - `get` / `list` - Read keys, optionally at a past revision

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// MetaKV command-line store tools.
#[derive(Parser)]
#[command(name = "metakv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store statistics and the applied watermark
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify commit log integrity
    Verify,

    /// Dump commit log records for debugging
    DumpLog {
        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Skip records before this byte offset
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Read one key
    Get {
        /// Key to read
        key: String,

        /// Read as of this revision
        #[arg(short, long)]
        revision: Option<u64>,
    },

    /// List live keys in [start, end)
    List {
        /// First key (inclusive)
        start: String,

        /// Last key (exclusive)
        end: String,

        /// Maximum number of keys
        #[arg(short, long)]
        limit: Option<usize>,

        /// Read as of this revision
        #[arg(short, long)]
        revision: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::DumpLog {
            limit,
            offset,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for dump-log")?;
            commands::dump_log::run(&path, limit, offset, &format)?;
        }
        Commands::Get { key, revision } => {
            let path = cli.path.ok_or("Store path required for get")?;
            commands::read::get(&path, &key, revision)?;
        }
        Commands::List {
            start,
            end,
            limit,
            revision,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for list")?;
            commands::read::list(&path, &start, &end, limit, revision, &format)?;
        }
        Commands::Version => {
            println!("MetaKV CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("MetaKV Core v{}", metakv_core::VERSION);
        }
    }

    Ok(())
}
