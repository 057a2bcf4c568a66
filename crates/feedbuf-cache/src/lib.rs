//! Disk video cache for feedbuf.
//!
//! - `cache` - `DiskVideoCache`: coordinated downloads, eviction, sweeping
//! - `index` - pure bookkeeping state machine (entries and active set)
//! - `progress` - download progress milestones
//! - `fetcher` - reqwest-based `VideoFetcherPort`

// Re-export core types for convenience
pub use feedbuf_core::{CacheConfig, CacheEntry, CacheEvent, VideoFetcherPort};

// Internal bookkeeping, exposed for adapters that want to inspect plans
pub mod index;
pub(crate) mod progress;

pub use index::{CacheIndex, IndexStats};
pub use progress::ProgressMilestones;

mod fetcher;

pub use fetcher::{HttpVideoFetcher, WritePlan};

// Public API
mod cache;

pub use cache::{
    CLEANUP_PRIORITY, CacheDeps, CacheFileKind, CacheFiles, CacheStats, DiskVideoCache,
    INIT_PRIORITY, PRELOAD_PRIORITY, SweepReport, classify, sweep_directory,
};
