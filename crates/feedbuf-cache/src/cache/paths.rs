//! Cache file layout.
//!
//! Every video owns exactly one file name inside the cache directory,
//! derived from its id: `{stem}.mp4` once complete, `{stem}.mp4.part` while
//! a download is in progress.

use std::path::{Path, PathBuf};

use feedbuf_core::VideoId;

/// Extension of a completed cache file.
pub const VIDEO_EXTENSION: &str = "mp4";

/// Suffix appended to an in-progress download.
pub const PARTIAL_SUFFIX: &str = ".part";

/// The files a video may own in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFiles {
    /// Completed file.
    pub complete: PathBuf,
    /// In-progress download.
    pub partial: PathBuf,
}

impl CacheFiles {
    /// Plan the file names for `id` inside `cache_dir`.
    pub fn plan(cache_dir: &Path, id: &VideoId) -> Self {
        let name = format!("{}.{VIDEO_EXTENSION}", id.file_stem());
        Self {
            partial: cache_dir.join(format!("{name}{PARTIAL_SUFFIX}")),
            complete: cache_dir.join(name),
        }
    }
}

/// Kind of a file found in the cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFileKind {
    /// A completed video.
    Complete,
    /// A leftover partial download.
    Partial,
}

/// Classify a file name found in the cache directory.
///
/// Returns the file stem and kind, or `None` for files the cache does not own.
pub fn classify(file_name: &str) -> Option<(&str, CacheFileKind)> {
    let complete_suffix = format!(".{VIDEO_EXTENSION}");
    if let Some(rest) = file_name.strip_suffix(PARTIAL_SUFFIX) {
        let stem = rest.strip_suffix(&complete_suffix)?;
        return (!stem.is_empty()).then_some((stem, CacheFileKind::Partial));
    }
    let stem = file_name.strip_suffix(&complete_suffix)?;
    (!stem.is_empty()).then_some((stem, CacheFileKind::Complete))
}
