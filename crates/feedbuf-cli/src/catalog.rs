//! Catalog backed by a local JSON file.
//!
//! The file holds an array of videos in catalog order (newest first), each
//! with optional metadata:
//!
//! ```json
//! [{"video": {"id": "a", "remote_url": "https://cdn.example.com/a.mp4", "created_at": "2026-01-05T00:00:00Z"}, "metadata": {"views": 3}}]
//! ```
//!
//! Page cursors are decimal offsets into the array.

use std::path::Path;

use async_trait::async_trait;

use feedbuf_core::{
    CatalogPage, FeedError, FeedResult, RemoteCatalogPort, VideoId, VideoWithMetadata,
};

/// In-memory catalog loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct JsonFileCatalog {
    videos: Vec<VideoWithMetadata>,
}

impl JsonFileCatalog {
    /// Wrap an already-ordered list.
    pub fn new(videos: Vec<VideoWithMetadata>) -> Self {
        Self { videos }
    }

    /// Read and parse `path`.
    pub async fn load(path: &Path) -> FeedResult<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            FeedError::catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Parse a JSON array of videos.
    pub fn from_json(text: &str) -> FeedResult<Self> {
        let videos: Vec<VideoWithMetadata> = serde_json::from_str(text)
            .map_err(|e| FeedError::catalog(format!("invalid catalog JSON: {e}")))?;
        Ok(Self::new(videos))
    }

    /// Number of videos.
    pub fn len(&self) -> usize {
        self.videos.len()
    }

    /// Whether the catalog holds no videos.
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    fn position(&self, id: &VideoId) -> FeedResult<usize> {
        self.videos
            .iter()
            .position(|v| v.id() == id)
            .ok_or_else(|| FeedError::catalog(format!("unknown video id {id}")))
    }
}

#[async_trait]
impl RemoteCatalogPort for JsonFileCatalog {
    async fn fetch_page(&self, count: usize, cursor: Option<&str>) -> FeedResult<CatalogPage> {
        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| FeedError::catalog(format!("invalid page cursor {c:?}")))?,
            None => 0,
        }
        .min(self.videos.len());
        let end = start.saturating_add(count).min(self.videos.len());
        let has_more = end < self.videos.len();

        Ok(CatalogPage {
            videos: self.videos[start..end].to_vec(),
            next_cursor: has_more.then(|| end.to_string()),
            has_more,
        })
    }

    async fn fetch_videos_after(
        &self,
        count: usize,
        after: &VideoId,
    ) -> FeedResult<Vec<VideoWithMetadata>> {
        let start = self.position(after)? + 1;
        Ok(self.videos.iter().skip(start).take(count).cloned().collect())
    }

    async fn fetch_videos_before(
        &self,
        count: usize,
        before: &VideoId,
    ) -> FeedResult<Vec<VideoWithMetadata>> {
        let end = self.position(before)?;
        Ok(self.videos[end.saturating_sub(count)..end].to_vec())
    }

    async fn fetch_by_id(&self, id: &VideoId) -> FeedResult<Option<VideoWithMetadata>> {
        Ok(self.videos.iter().find(|v| v.id() == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"[
        {"video": {"id": "a", "remote_url": "https://cdn.example.com/a.mp4", "created_at": "2026-01-05T00:00:00Z"}, "metadata": {"views": 3, "likes": 1}},
        {"video": {"id": "b", "remote_url": "https://cdn.example.com/b.mp4", "created_at": "2026-01-04T00:00:00Z"}},
        {"video": {"id": "c", "remote_url": "https://cdn.example.com/c.mp4", "created_at": "2026-01-03T00:00:00Z"}},
        {"video": {"id": "d", "remote_url": "https://cdn.example.com/d.mp4", "created_at": "2026-01-02T00:00:00Z"}}
    ]"#;

    fn ids(videos: &[VideoWithMetadata]) -> Vec<&str> {
        videos.iter().map(|v| v.id().as_str()).collect()
    }

    #[tokio::test]
    async fn test_pages_follow_cursor() {
        let catalog = JsonFileCatalog::from_json(SAMPLE).unwrap();

        let first = catalog.fetch_page(3, None).await.unwrap();
        assert_eq!(ids(&first.videos), vec!["a", "b", "c"]);
        assert!(first.has_more);
        assert_eq!(first.next_cursor.as_deref(), Some("3"));

        let second = catalog
            .fetch_page(3, first.next_cursor.as_deref())
            .await
            .unwrap();
        assert_eq!(ids(&second.videos), vec!["d"]);
        assert!(!second.has_more);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_adjacent_fetches() {
        let catalog = JsonFileCatalog::from_json(SAMPLE).unwrap();

        let after = catalog.fetch_videos_after(2, &VideoId::new("b")).await.unwrap();
        assert_eq!(ids(&after), vec!["c", "d"]);
        assert!(catalog
            .fetch_videos_after(1, &VideoId::new("d"))
            .await
            .unwrap()
            .is_empty());

        let before = catalog.fetch_videos_before(2, &VideoId::new("d")).await.unwrap();
        assert_eq!(ids(&before), vec!["b", "c"]);
        assert!(catalog
            .fetch_videos_before(1, &VideoId::new("a"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_catalog_error() {
        let catalog = JsonFileCatalog::from_json(SAMPLE).unwrap();
        let err = catalog
            .fetch_videos_after(1, &VideoId::new("zzz"))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::CatalogFetchFailed { .. }));
        assert!(catalog.fetch_by_id(&VideoId::new("zzz")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let catalog = JsonFileCatalog::load(&path).await.unwrap();
        assert_eq!(catalog.len(), 4);
        let a = catalog.fetch_by_id(&VideoId::new("a")).await.unwrap().unwrap();
        assert_eq!(a.metadata.views, 3);

        assert!(JsonFileCatalog::load(&dir.path().join("missing.json"))
            .await
            .is_err());
        assert!(JsonFileCatalog::from_json("{not json").is_err());
    }
}
