//! spoolq CLI
//!
//! Command-line tools for inspecting and maintaining queue directories.
//!
//! # Commands
//!
//! - `stats` - Display queue statistics
//! - `clean` - Delete the oldest segments down to a retained count
//! - `dump`  - Print records starting from a position

mod commands;

use clap::{Parser, Subcommand};
use spoolq_core::RecordId;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// spoolq command-line queue tools.
#[derive(Parser)]
#[command(name = "spoolq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the queue directory
    #[arg(global = true, short, long)]
    dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display queue statistics
    Stats {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete the oldest segments down to a retained count
    Clean {
        /// Number of most recent segments to keep
        #[arg(short, long)]
        retain: usize,

        /// Close in-use segments instead of stopping at them
        #[arg(short, long)]
        force: bool,
    },

    /// Print records starting from a position
    Dump {
        /// Position to start from, as `segment:offset`
        #[arg(long)]
        from: Option<RecordId>,

        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Segment capacity the records were written under (bytes)
        #[arg(long)]
        segment_capacity: Option<u64>,

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
        Commands::Stats { format } => {
            let dir = cli.dir.ok_or("Queue directory required for stats")?;
            commands::stats::run(&dir, &format)?;
        }
        Commands::Clean { retain, force } => {
            let dir = cli.dir.ok_or("Queue directory required for clean")?;
            commands::clean::run(&dir, retain, force)?;
        }
        Commands::Dump {
            from,
            limit,
            segment_capacity,
            format,
        } => {
            let dir = cli.dir.ok_or("Queue directory required for dump")?;
            commands::dump::run(&dir, from, limit, segment_capacity, &format)?;
        }
        Commands::Version => {
            println!("spoolq CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("spoolq core v{}", spoolq_core::VERSION);
        }
    }

    Ok(())
}
