//! Cache events.
//!
//! Emitted by the disk cache through `CacheEventEmitterPort` so that a
//! presentation layer can show download progress without polling.

use serde::{Deserialize, Serialize};

use crate::domain::VideoId;

/// Events emitted by the disk video cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    /// A download started (or resumed from `resumed_from` bytes).
    DownloadStarted {
        /// Video being downloaded.
        video_id: VideoId,
        /// Bytes already on disk from an earlier partial attempt.
        resumed_from: u64,
    },

    /// A download crossed a progress milestone.
    DownloadProgress {
        /// Video being downloaded.
        video_id: VideoId,
        /// Bytes written so far.
        downloaded: u64,
        /// Expected total, when the server reported one.
        total: Option<u64>,
        /// Milestone percentage (25, 50, 75 or 100).
        percent: u8,
    },

    /// A download completed and the entry was inserted.
    DownloadCompleted {
        /// Video downloaded.
        video_id: VideoId,
        /// Final file size.
        size_bytes: u64,
    },

    /// A download failed; any partial file was removed.
    DownloadFailed {
        /// Video that failed.
        video_id: VideoId,
        /// Error message.
        error: String,
    },

    /// An entry was evicted.
    Evicted {
        /// Evicted video.
        video_id: VideoId,
        /// Bytes reclaimed.
        size_bytes: u64,
    },

    /// The whole cache was cleared.
    Cleared {
        /// Number of files removed from disk.
        files_removed: usize,
    },
}

impl CacheEvent {
    /// The video this event concerns, if any.
    #[must_use]
    pub const fn video_id(&self) -> Option<&VideoId> {
        match self {
            Self::DownloadStarted { video_id, .. }
            | Self::DownloadProgress { video_id, .. }
            | Self::DownloadCompleted { video_id, .. }
            | Self::DownloadFailed { video_id, .. }
            | Self::Evicted { video_id, .. } => Some(video_id),
            Self::Cleared { .. } => None,
        }
    }
}
