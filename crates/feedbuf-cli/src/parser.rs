//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the feed buffer.
#[derive(Parser)]
#[command(name = "feedbuf")]
#[command(about = "Walk a video feed and manage its disk cache")]
#[command(version)]
pub struct Cli {
    /// Cache directory (defaults to the platform cache dir)
    #[arg(long = "cache-dir", env = "FEEDBUF_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// JSON settings file
    #[arg(long = "config", env = "FEEDBUF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
