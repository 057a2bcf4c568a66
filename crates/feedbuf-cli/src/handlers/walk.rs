//! Walk command handler.
//!
//! Opens a feed window over a JSON catalog and rotates through it, showing
//! where each video is cached.

use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::HumanBytes;

use feedbuf_core::VideoWithMetadata;
use feedbuf_feed::{FeedWindow, FeedWindowDeps};

use crate::bootstrap::CliContext;
use crate::catalog::JsonFileCatalog;
use crate::commands::WalkArgs;
use crate::presentation::{print_separator, truncate_string};

/// Execute the walk command.
///
/// Each step rotates the window once and waits for the current video to be
/// cached. A failed download is reported and the walk goes on. The walk
/// stops early at the start or end of the catalog.
pub async fn execute(ctx: &CliContext, args: &WalkArgs) -> Result<()> {
    let catalog = JsonFileCatalog::load(&args.catalog)
        .await
        .with_context(|| format!("Failed to load catalog {}", args.catalog.display()))?;
    if catalog.is_empty() {
        println!("Catalog {} is empty.", args.catalog.display());
        return Ok(());
    }
    println!("Loaded {} video(s) from {}", catalog.len(), args.catalog.display());

    let window = FeedWindow::load(FeedWindowDeps {
        coordinator: ctx.coordinator.clone(),
        cache: ctx.cache.clone(),
        catalog: Arc::new(catalog),
        config: ctx.settings.window_config(),
    })
    .await?;

    print_header();
    show_current(ctx, &window, 0).await;

    for step in 1..=args.steps {
        let before = window.current_index();
        let before_id = window.current_video().map(|v| v.id().clone());
        if args.backward {
            window.rotate_backward().await?;
        } else {
            window.rotate_forward().await?;
        }

        let after_id = window.current_video().map(|v| v.id().clone());
        if window.current_index() == before && after_id == before_id {
            let edge = if args.backward { "start" } else { "end" };
            println!("Reached the {edge} of the catalog after {} step(s).", step - 1);
            break;
        }
        show_current(ctx, &window, step).await;
    }

    print_separator(72);
    let stats = ctx.cache.stats();
    println!(
        "Cache: {} entr{} ({} of {}), {} pinned",
        stats.entries,
        if stats.entries == 1 { "y" } else { "ies" },
        HumanBytes(stats.total_bytes),
        HumanBytes(stats.max_bytes),
        stats.pinned
    );
    Ok(())
}

fn print_header() {
    println!("{:<5} {:<24} {:<8} {:<8} Cached at", "Step", "Video", "Views", "Likes");
    print_separator(72);
}

async fn show_current(ctx: &CliContext, window: &FeedWindow, step: usize) {
    let Some(current) = window.current_video() else {
        return;
    };
    let location = cache_current(ctx, &current).await;
    println!(
        "{:<5} {:<24} {:<8} {:<8} {}",
        step,
        truncate_string(current.id().as_str(), 23),
        current.metadata.views,
        current.metadata.likes,
        location
    );
}

/// Preload the current video, joining the window's own preload when one is
/// already in flight. A transient failure is retried once.
async fn cache_current(ctx: &CliContext, current: &VideoWithMetadata) -> String {
    let mut result = ctx.cache.preload_video(&current.video).await;
    if let Err(e) = &result {
        if e.is_retryable() {
            tracing::debug!(video_id = %current.id(), error = %e, "Retrying download");
            result = ctx.cache.preload_video(&current.video).await;
        }
    }
    match result {
        Ok(path) => path.display().to_string(),
        Err(e) => {
            tracing::warn!(video_id = %current.id(), error = %e, "Could not cache current video");
            format!("(not cached: {e})")
        }
    }
}
