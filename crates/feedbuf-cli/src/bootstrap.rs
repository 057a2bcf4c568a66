//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Settings (file or defaults) and the cache directory
//! - The shared `TaskCoordinator`
//! - `DiskVideoCache` over the HTTP fetcher
//!
//! Command handlers receive the composed `CliContext`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use feedbuf_cache::{CacheDeps, DiskVideoCache, HttpVideoFetcher};
use feedbuf_coordinator::TaskCoordinator;
use feedbuf_core::{CacheEvent, CacheEventEmitterPort, FeedbufSettings};

/// Connect timeout of the HTTP fetcher.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Load `.env` from the working directory, if present.
///
/// Runs before argument parsing so env-backed flags see its values.
pub fn load_env() {
    dotenvy::dotenv().ok();
}

/// Install the tracing subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Effective settings.
    pub settings: FeedbufSettings,
    /// Resolved cache directory.
    pub cache_dir: PathBuf,
}

impl CliConfig {
    /// Resolve settings and the cache directory.
    ///
    /// The directory comes from `cache_dir`, then the settings file, then the
    /// platform default.
    pub fn resolve(config_path: Option<&Path>, cache_dir: Option<PathBuf>) -> Result<Self> {
        let settings = match config_path {
            Some(path) => FeedbufSettings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => FeedbufSettings::default(),
        };

        let cache_dir = settings.resolve_cache_dir(cache_dir)?;
        Ok(Self {
            settings,
            cache_dir,
        })
    }
}

/// Logs cache events for the terminal.
#[derive(Debug, Default)]
pub struct TracingCacheEmitter;

impl CacheEventEmitterPort for TracingCacheEmitter {
    fn emit(&self, event: CacheEvent) {
        match &event {
            CacheEvent::DownloadProgress {
                video_id, percent, ..
            } => tracing::info!(video_id = %video_id, percent, "Downloading"),
            CacheEvent::DownloadFailed { video_id, error } => {
                tracing::warn!(video_id = %video_id, error = %error, "Download failed");
            }
            other => tracing::debug!(event = ?other, "Cache event"),
        }
    }
}

/// Fully composed context for CLI commands.
#[derive(Clone)]
pub struct CliContext {
    /// Shared scheduler.
    pub coordinator: TaskCoordinator,
    /// Disk cache.
    pub cache: DiskVideoCache,
    /// Effective settings.
    pub settings: FeedbufSettings,
}

/// Wire the components together.
pub fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let coordinator = TaskCoordinator::new(config.settings.coordinator_config());
    let fetcher = HttpVideoFetcher::new(CONNECT_TIMEOUT).context("Failed to build HTTP client")?;
    let cache = DiskVideoCache::new(CacheDeps {
        coordinator: coordinator.clone(),
        fetcher: Arc::new(fetcher),
        emitter: Arc::new(TracingCacheEmitter),
        config: config.settings.cache_config(config.cache_dir),
    });
    tracing::debug!(cache_dir = %cache.config().cache_dir.display(), "CLI context ready");

    Ok(CliContext {
        coordinator,
        cache,
        settings: config.settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_cache_dir_wins() {
        let dir = TempDir::new().unwrap();
        let settings_path = dir.path().join("settings.json");
        std::fs::write(&settings_path, r#"{"cache_dir": "/from/settings", "window_size": 7}"#)
            .unwrap();

        let config =
            CliConfig::resolve(Some(&settings_path), Some(PathBuf::from("/from/flag"))).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.settings.effective_window_size(), 7);

        let config = CliConfig::resolve(Some(&settings_path), None).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/from/settings"));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let dir = TempDir::new().unwrap();
        let settings_path = dir.path().join("settings.json");
        std::fs::write(&settings_path, r#"{"window_size": 0}"#).unwrap();

        assert!(CliConfig::resolve(Some(&settings_path), Some(dir.path().to_path_buf())).is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_uses_settings() {
        let dir = TempDir::new().unwrap();
        let mut settings = FeedbufSettings::default();
        settings.max_cache_bytes = Some(1_024);
        settings.entry_max_age_secs = Some(90);
        settings.cache_dir = Some("/ignored/by/resolved/dir".to_string());

        let ctx = bootstrap(CliConfig {
            settings,
            cache_dir: dir.path().to_path_buf(),
        })
        .unwrap();

        assert_eq!(ctx.cache.config().max_cache_bytes, 1_024);
        assert_eq!(ctx.cache.config().entry_max_age, Duration::from_secs(90));
        assert_eq!(ctx.cache.config().cache_dir, dir.path());
    }
}
