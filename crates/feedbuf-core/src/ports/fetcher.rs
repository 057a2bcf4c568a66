//! Video fetcher port.
//!
//! The transport used to bring a remote video onto local disk. The cache
//! treats it as opaque: it only decides where the bytes go and how much of
//! a previous attempt is already present.

use std::path::Path;

use async_trait::async_trait;

use crate::error::FeedResult;

/// Progress callback: `(bytes_on_disk, expected_total)`.
pub type ProgressFn<'a> = dyn Fn(u64, Option<u64>) + Send + Sync + 'a;

/// Port for downloading a remote video to a local path.
#[async_trait]
pub trait VideoFetcherPort: Send + Sync {
    /// Download `url` into `dest`.
    ///
    /// When `resume_from` is non-zero, `dest` already holds that many bytes
    /// of an earlier attempt and the implementation should append the
    /// remainder (or truncate and restart if the server cannot resume).
    ///
    /// Returns the final number of bytes in `dest`.
    async fn fetch_to_path(
        &self,
        url: &str,
        dest: &Path,
        resume_from: u64,
        progress: &ProgressFn<'_>,
    ) -> FeedResult<u64>;
}
