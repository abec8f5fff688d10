use std::path::PathBuf;

use clap::{Parser, Subcommand};

// ============================================================================
// Subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the value stored under a key and print it as JSON
    Get { key: String },
    /// Store a JSON value under a key
    Put { key: String, value: String },
    /// Remove a key (a no-op if it is absent)
    Rm { key: String },
    /// Flush any dirty buckets to disk
    Flush,
    /// Print cache hit/miss and occupancy counters
    Info,
    /// Remove the store's root directory entirely
    Destroy {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

// ============================================================================
// Top-Level Arguments
// ============================================================================

/// hashkv - an embedded, filesystem-backed key-value store
#[derive(Parser, Debug)]
#[command(name = "hashkv")]
#[command(about = "Inspect and operate on a hashkv store from the command line")]
pub struct Args {
    /// Root directory of the store
    #[arg(long)]
    pub root: PathBuf,

    /// Objects per bucket before it splits (default: 512)
    #[arg(long)]
    pub max_objects_per_bucket: Option<usize>,

    /// Buckets held in the in-memory LRU cache (default: 512)
    #[arg(long)]
    pub max_buckets_cached: Option<usize>,

    /// Partition-lock pool size (default: 8)
    #[arg(long)]
    pub partitions: Option<usize>,

    /// Raise logging verbosity (repeatable: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

pub fn parse_args() -> Args {
    Args::parse()
}
