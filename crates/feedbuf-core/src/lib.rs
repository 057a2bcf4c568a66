//! Core domain types, errors, configuration and ports for the feed
//! buffering subsystem.
//!
//! - `domain` - videos, metadata, catalog pages, cache entries
//! - `error` - the `FeedError` taxonomy shared by every component
//! - `ports` - remote catalog, video fetcher and cache event emitter traits
//! - `config` / `settings` - tuning constants and user settings
//! - `paths` - cache directory resolution and preparation
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use config::{
    CacheConfig, CoordinatorConfig, DEFAULT_ENTRY_MAX_AGE, DEFAULT_MAX_CACHE_BYTES,
    DEFAULT_OPERATION_TIMEOUT, DEFAULT_PRELOAD_FAN_OUT, DEFAULT_WINDOW_SIZE, ResourceWaitPolicy,
    WindowConfig,
};
pub use domain::{CacheEntry, CatalogPage, Video, VideoId, VideoMetadata, VideoWithMetadata};
pub use error::{FeedError, FeedResult};
pub use events::CacheEvent;
pub use paths::{
    DirectoryCreationStrategy, PathError, default_cache_dir, ensure_directory, verify_writable,
};
pub use ports::{
    CacheEventEmitterPort, NoopCacheEmitter, ProgressFn, RemoteCatalogPort, VideoFetcherPort,
};
pub use settings::{FeedbufSettings, SettingsError, validate_settings};
