//! Cache command handlers.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::HumanBytes;

use feedbuf_cache::{CacheFileKind, classify};

use crate::bootstrap::CliContext;
use crate::commands::CacheCommand;
use crate::presentation::print_separator;

/// Execute a cache subcommand.
pub async fn execute(ctx: &CliContext, command: &CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Stats => stats(ctx).await,
        CacheCommand::Clear => {
            let removed = ctx.cache.clear_cache().await?;
            println!("Removed {removed} file(s) from {}", ctx.cache.config().cache_dir.display());
            Ok(())
        }
        CacheCommand::Sweep => {
            let report = ctx.cache.sweep().await?;
            println!(
                "Sweep removed {} file(s), kept {} video(s) and {} partial download(s)",
                report.removed.len(),
                report.adopted.len(),
                report.kept_partial
            );
            for path in &report.removed {
                println!("  removed {}", path.display());
            }
            Ok(())
        }
    }
}

/// What a directory scan found.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DiskUsage {
    /// Completed videos.
    pub videos: usize,
    /// Partial downloads.
    pub partials: usize,
    /// Bytes held by both.
    pub bytes: u64,
}

async fn stats(ctx: &CliContext) -> Result<()> {
    let config = ctx.cache.config();
    let usage = scan(&config.cache_dir).await?;

    println!("Cache directory: {}", config.cache_dir.display());
    print_separator(48);
    println!("{:<20} {}", "Videos", usage.videos);
    println!("{:<20} {}", "Partial downloads", usage.partials);
    println!("{:<20} {}", "Disk usage", HumanBytes(usage.bytes));
    println!("{:<20} {}", "Size cap", HumanBytes(config.max_cache_bytes));
    println!("{:<20} {}s", "Max entry age", config.entry_max_age.as_secs());
    Ok(())
}

/// Count cache files under `dir`. A missing directory is an empty cache.
pub async fn scan(dir: &Path) -> Result<DiskUsage> {
    let mut usage = DiskUsage::default();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(usage),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", dir.display()));
        }
    };

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some((_, kind)) = name.to_str().and_then(classify) else {
            continue;
        };
        let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
        match kind {
            CacheFileKind::Complete => usage.videos += 1,
            CacheFileKind::Partial => usage.partials += 1,
        }
        usage.bytes += size;
    }
    Ok(usage)
}
