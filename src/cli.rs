//! CLI definition.

use clap::Parser;
use std::path::PathBuf;

/// Todo REST API server with two-level subtasks.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(long)]
    pub bind: Option<String>,

    /// Listen port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}
