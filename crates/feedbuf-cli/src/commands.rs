//! Subcommand definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Open a feed over a JSON catalog and rotate through it
    Walk(WalkArgs),

    /// Inspect or maintain the video cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

/// Arguments of `walk`.
#[derive(Args, Debug, Clone)]
pub struct WalkArgs {
    /// JSON file holding the catalog (an array of videos, newest first)
    #[arg(long)]
    pub catalog: PathBuf,

    /// Number of rotations to perform
    #[arg(long, default_value_t = 10)]
    pub steps: usize,

    /// Rotate backward instead of forward
    #[arg(long)]
    pub backward: bool,
}

/// Cache maintenance commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Show entry count and disk usage
    Stats,
    /// Delete every cached video
    Clear,
    /// Run the startup sweep with nothing active
    Sweep,
}
