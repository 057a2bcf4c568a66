//! Cached video file bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::VideoId;

/// One cached video file.
///
/// Entries flagged `is_preloading` have a download in flight and are
/// never evicted nor returned as cache hits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache key.
    pub video_id: VideoId,
    /// Owned file path inside the cache directory.
    pub local_path: PathBuf,
    /// Size of the file on disk.
    pub size_bytes: u64,
    /// Refreshed on every cache hit; eviction removes oldest first.
    pub last_accessed: DateTime<Utc>,
    /// True while a download for this id is in flight.
    pub is_preloading: bool,
}

impl CacheEntry {
    /// Create a completed entry accessed now.
    pub fn new(video_id: VideoId, local_path: PathBuf, size_bytes: u64) -> Self {
        Self {
            video_id,
            local_path,
            size_bytes,
            last_accessed: Utc::now(),
            is_preloading: false,
        }
    }

    /// Create a placeholder for a download that has not finished yet.
    pub fn preloading(video_id: VideoId, local_path: PathBuf) -> Self {
        Self {
            is_preloading: true,
            ..Self::new(video_id, local_path, 0)
        }
    }

    /// Set the last access time.
    #[must_use]
    pub const fn with_last_accessed(mut self, at: DateTime<Utc>) -> Self {
        self.last_accessed = at;
        self
    }

    /// Refresh the access time.
    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }
}
