//! Cache directory location.

use std::path::PathBuf;

use super::error::PathError;

/// Default cache directory relative to the platform cache root.
pub const DEFAULT_CACHE_DIR_RELATIVE: &str = "feedbuf/videos";

/// Platform default cache directory (e.g. `~/.cache/feedbuf/videos`).
pub fn default_cache_dir() -> Result<PathBuf, PathError> {
    dirs::cache_dir()
        .map(|root| root.join(DEFAULT_CACHE_DIR_RELATIVE))
        .ok_or(PathError::NoCacheDir)
}
