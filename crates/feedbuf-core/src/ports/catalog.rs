//! Remote catalog port.
//!
//! The catalog is the external, paginated, ordered source of videos. Items
//! are returned in a stable order (creation time, descending) so "after" and
//! "before" a given id are well-defined.

use async_trait::async_trait;

use crate::domain::{CatalogPage, VideoId, VideoWithMetadata};
use crate::error::FeedResult;

/// Port for querying the remote video catalog.
///
/// Implementations map their transport failures to
/// `FeedError::CatalogFetchFailed`.
#[async_trait]
pub trait RemoteCatalogPort: Send + Sync {
    /// Fetch a page of up to `count` videos, starting at `cursor`
    /// (or at the head of the catalog when `None`).
    async fn fetch_page(&self, count: usize, cursor: Option<&str>) -> FeedResult<CatalogPage>;

    /// Fetch up to `count` videos that follow `after` in catalog order.
    ///
    /// An empty result means the end of the catalog was reached.
    async fn fetch_videos_after(
        &self,
        count: usize,
        after: &VideoId,
    ) -> FeedResult<Vec<VideoWithMetadata>>;

    /// Fetch up to `count` videos that precede `before` in catalog order,
    /// returned in catalog order (the one closest to `before` last).
    ///
    /// An empty result means the start of the catalog was reached.
    async fn fetch_videos_before(
        &self,
        count: usize,
        before: &VideoId,
    ) -> FeedResult<Vec<VideoWithMetadata>>;

    /// Fetch a single video by id.
    async fn fetch_by_id(&self, id: &VideoId) -> FeedResult<Option<VideoWithMetadata>>;
}
