//! Video domain types.
//!
//! Pure data types with no I/O dependencies. Videos are immutable once
//! fetched from the remote catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Stable identifier of a video in the remote catalog.
///
/// Used as the cache key, as part of operation ids, and to derive the
/// per-video resource lock.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Create a new video id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-system safe stem for this id.
    ///
    /// Lowercase letters, digits, `-` and `_` are kept; every other byte is
    /// written as `%XX`. Distinct ids always get distinct stems, also on
    /// case-insensitive file systems.
    #[must_use]
    pub fn file_stem(&self) -> String {
        let mut stem = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            match byte {
                b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => stem.push(char::from(byte)),
                _ => {
                    let _ = write!(stem, "%{byte:02X}");
                }
            }
        }
        stem
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VideoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A video as returned by the remote catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Catalog identifier.
    pub id: VideoId,
    /// Remote location of the video file.
    pub remote_url: String,
    /// Creation time; the catalog orders videos by this, newest first.
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Create a new video created now.
    pub fn new(id: impl Into<VideoId>, remote_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            remote_url: remote_url.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether this video can be downloaded at all.
    #[must_use]
    pub fn has_remote_url(&self) -> bool {
        !self.remote_url.trim().is_empty()
    }
}

/// Engagement statistics owned by the interaction subsystem.
///
/// Carried through the feed untouched. Missing metadata is synthesized as
/// the zero-valued default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoMetadata {
    /// View count.
    pub views: u64,
    /// Like count.
    pub likes: u64,
    /// Any further fields the interaction subsystem attaches.
    pub extra: serde_json::Value,
}

/// A video paired with its engagement metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoWithMetadata {
    /// The catalog video.
    pub video: Video,
    /// Engagement metadata.
    #[serde(default)]
    pub metadata: VideoMetadata,
}

impl VideoWithMetadata {
    /// Pair a video with metadata.
    pub const fn new(video: Video, metadata: VideoMetadata) -> Self {
        Self { video, metadata }
    }

    /// Pair a video with zero-valued metadata.
    pub fn with_default_metadata(video: Video) -> Self {
        Self::new(video, VideoMetadata::default())
    }

    /// Shortcut for the video id.
    #[must_use]
    pub const fn id(&self) -> &VideoId {
        &self.video.id
    }
}

/// One page of the remote catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// Videos in catalog order.
    pub videos: Vec<VideoWithMetadata>,
    /// Opaque token for the following page.
    pub next_cursor: Option<String>,
    /// Whether the catalog has more items after this page.
    pub has_more: bool,
}
