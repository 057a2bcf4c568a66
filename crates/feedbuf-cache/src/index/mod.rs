//! Cache bookkeeping.
//!
//! This module provides a pure state machine over cache entries and the
//! active set. No I/O is performed here; `DiskVideoCache` performs the file
//! operations that the eviction plans call for.
//!
//! # Pinning
//!
//! An entry is pinned, and therefore never planned for eviction, while its
//! id is in the active set or its download is still in flight.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use feedbuf_core::{CacheEntry, VideoId};

/// Aggregate numbers over the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of entries, including in-flight placeholders.
    pub entries: usize,
    /// Sum of entry sizes.
    pub total_bytes: u64,
    /// Entries exempt from eviction.
    pub pinned: usize,
    /// Entries whose download is in flight.
    pub preloading: usize,
}

/// In-memory index of cached files and the active set.
///
/// This is a sync type with no internal locking; the caller
/// (`DiskVideoCache`) is responsible for synchronization.
#[derive(Debug, Default)]
pub struct CacheIndex {
    entries: HashMap<VideoId, CacheEntry>,
    active: HashSet<VideoId>,
}

impl CacheIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry.
    pub fn get(&self, id: &VideoId) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    /// Look up a completed entry and refresh its access time.
    pub fn hit(&mut self, id: &VideoId) -> Option<&CacheEntry> {
        let entry = self.entries.get_mut(id).filter(|e| !e.is_preloading)?;
        entry.touch();
        Some(entry)
    }

    /// Insert an in-flight placeholder for `id`.
    pub fn begin_preload(&mut self, id: VideoId, local_path: PathBuf) {
        self.entries
            .insert(id.clone(), CacheEntry::preloading(id, local_path));
    }

    /// Record a completed file. Replaces any previous entry for the id.
    pub fn complete(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.video_id.clone(), entry);
    }

    /// Drop the in-flight placeholder for `id`, leaving completed entries alone.
    pub fn abort_preload(&mut self, id: &VideoId) -> bool {
        if self.entries.get(id).is_some_and(|e| e.is_preloading) {
            self.entries.remove(id);
            true
        } else {
            false
        }
    }

    /// Remove an entry unconditionally.
    pub fn remove(&mut self, id: &VideoId) -> Option<CacheEntry> {
        self.entries.remove(id)
    }

    /// Remove every completed entry, keeping in-flight placeholders.
    pub fn clear_completed(&mut self) -> Vec<CacheEntry> {
        let ids: Vec<_> = self
            .entries
            .values()
            .filter(|e| !e.is_preloading)
            .map(|e| e.video_id.clone())
            .collect();
        ids.iter().filter_map(|id| self.entries.remove(id)).collect()
    }

    /// Replace the active set.
    pub fn set_active<I: IntoIterator<Item = VideoId>>(&mut self, ids: I) {
        self.active = ids.into_iter().collect();
    }

    /// The current active set.
    pub const fn active(&self) -> &HashSet<VideoId> {
        &self.active
    }

    /// Ids that must keep their files: the active set plus in-flight downloads.
    pub fn pinned_ids(&self) -> HashSet<VideoId> {
        self.entries
            .values()
            .filter(|e| e.is_preloading)
            .map(|e| e.video_id.clone())
            .chain(self.active.iter().cloned())
            .collect()
    }

    /// Check whether `id` may be evicted right now.
    pub fn is_evictable(&self, id: &VideoId) -> bool {
        self.entries
            .get(id)
            .is_some_and(|e| !e.is_preloading && !self.active.contains(id))
    }

    /// Sum of all entry sizes.
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }

    /// Entries that are neither active nor in flight, oldest first.
    fn eviction_candidates(&self, protect: Option<&VideoId>) -> Vec<&CacheEntry> {
        let mut candidates: Vec<_> = self
            .entries
            .values()
            .filter(|e| self.is_evictable(&e.video_id) && Some(&e.video_id) != protect)
            .collect();
        candidates.sort_by(|a, b| {
            a.last_accessed
                .cmp(&b.last_accessed)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        candidates
    }

    /// Plan the evictions that bring the total size under `max_bytes`.
    ///
    /// Oldest entries go first; pinned entries are skipped. `protect` is
    /// skipped too, but only while its own size fits under `max_bytes`; an
    /// inactive entry larger than the cap is always evicted. The plan may fall
    /// short of the cap when everything left is pinned.
    pub fn plan_size_eviction(&self, max_bytes: u64, protect: Option<&VideoId>) -> Vec<VideoId> {
        let protect = protect.filter(|id| {
            self.entries
                .get(*id)
                .is_some_and(|e| e.size_bytes <= max_bytes)
        });
        let mut total = self.total_bytes();
        let mut plan = Vec::new();
        for entry in self.eviction_candidates(protect) {
            if total <= max_bytes {
                break;
            }
            total = total.saturating_sub(entry.size_bytes);
            plan.push(entry.video_id.clone());
        }
        plan
    }

    /// Plan the eviction of every entry outside the active set.
    pub fn plan_inactive_eviction(&self) -> Vec<VideoId> {
        self.eviction_candidates(None)
            .into_iter()
            .map(|e| e.video_id.clone())
            .collect()
    }

    /// Aggregate numbers.
    pub fn stats(&self) -> IndexStats {
        let preloading = self.entries.values().filter(|e| e.is_preloading).count();
        let pinned = self
            .entries
            .values()
            .filter(|e| e.is_preloading || self.active.contains(&e.video_id))
            .count();
        IndexStats {
            entries: self.entries.len(),
            total_bytes: self.total_bytes(),
            pinned,
            preloading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(id: &str, size: u64, accessed_secs: i64) -> CacheEntry {
        let at = Utc.timestamp_opt(1_700_000_000 + accessed_secs, 0).unwrap();
        CacheEntry::new(
            VideoId::new(id),
            PathBuf::from(format!("/cache/{id}.mp4")),
            size,
        )
        .with_last_accessed(at)
    }

    fn ids(plan: &[VideoId]) -> Vec<&str> {
        plan.iter().map(VideoId::as_str).collect()
    }

    fn index_with(entries: &[(&str, u64, i64)]) -> CacheIndex {
        let mut index = CacheIndex::new();
        for (id, size, at) in entries {
            index.complete(entry(id, *size, *at));
        }
        index
    }

    #[test]
    fn test_size_eviction_oldest_first() {
        let index = index_with(&[("new", 40, 30), ("old", 40, 10), ("mid", 40, 20)]);

        let plan = index.plan_size_eviction(80, None);
        assert_eq!(ids(&plan), vec!["old"]);

        let plan = index.plan_size_eviction(40, None);
        assert_eq!(ids(&plan), vec!["old", "mid"]);
    }

    #[test]
    fn test_size_eviction_noop_under_cap() {
        let index = index_with(&[("a", 10, 1), ("b", 10, 2)]);
        assert!(index.plan_size_eviction(20, None).is_empty());
    }

    #[test]
    fn test_active_entries_are_never_planned() {
        let mut index = index_with(&[("old", 50, 1), ("mid", 50, 2), ("new", 50, 3)]);
        index.set_active([VideoId::new("old")]);

        let plan = index.plan_size_eviction(0, None);
        assert_eq!(ids(&plan), vec!["mid", "new"]);
        assert!(!index.is_evictable(&VideoId::new("old")));
    }

    #[test]
    fn test_preloading_and_protected_are_skipped() {
        let mut index = index_with(&[("old", 50, 1), ("new", 50, 3)]);
        index.begin_preload(VideoId::new("loading"), PathBuf::from("/cache/loading.mp4"));

        let plan = index.plan_size_eviction(50, Some(&VideoId::new("old")));
        assert_eq!(ids(&plan), vec!["new"]);
    }

    #[test]
    fn test_protected_entry_larger_than_cap_is_evicted() {
        let index = index_with(&[("small", 10, 1), ("huge", 510, 2)]);

        let plan = index.plan_size_eviction(100, Some(&VideoId::new("huge")));
        assert_eq!(ids(&plan), vec!["small", "huge"]);

        let plan = index.plan_size_eviction(600, Some(&VideoId::new("huge")));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_inactive_eviction_plans_everything_unpinned() {
        let mut index = index_with(&[("a", 1, 1), ("b", 1, 2), ("c", 1, 3)]);
        index.set_active([VideoId::new("b")]);
        assert_eq!(ids(&index.plan_inactive_eviction()), vec!["a", "c"]);
    }

    #[test]
    fn test_pinned_ids_include_in_flight() {
        let mut index = index_with(&[("a", 1, 1)]);
        index.set_active([VideoId::new("b")]);
        index.begin_preload(VideoId::new("c"), PathBuf::from("/cache/c.mp4"));

        let pinned = index.pinned_ids();
        assert_eq!(pinned.len(), 2);
        assert!(pinned.contains(&VideoId::new("b")));
        assert!(pinned.contains(&VideoId::new("c")));
    }

    #[test]
    fn test_hit_ignores_placeholders_and_touches() {
        let mut index = index_with(&[("a", 5, 0)]);
        index.begin_preload(VideoId::new("b"), PathBuf::from("/cache/b.mp4"));

        let before = index.get(&VideoId::new("a")).unwrap().last_accessed;
        let hit = index.hit(&VideoId::new("a")).unwrap();
        assert!(hit.last_accessed > before);
        assert!(index.hit(&VideoId::new("b")).is_none());
    }

    #[test]
    fn test_abort_only_removes_placeholder() {
        let mut index = index_with(&[("done", 5, 0)]);
        index.begin_preload(VideoId::new("loading"), PathBuf::from("/cache/loading.mp4"));

        assert!(index.abort_preload(&VideoId::new("loading")));
        assert!(!index.abort_preload(&VideoId::new("done")));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_clear_completed_keeps_in_flight() {
        let mut index = index_with(&[("a", 5, 0), ("b", 7, 1)]);
        index.begin_preload(VideoId::new("c"), PathBuf::from("/cache/c.mp4"));

        let removed = index.clear_completed();
        assert_eq!(removed.len(), 2);
        assert_eq!(index.len(), 1);
        assert_eq!(index.total_bytes(), 0);
    }

    #[test]
    fn test_stats() {
        let mut index = index_with(&[("a", 5, 0), ("b", 7, 1)]);
        index.set_active([VideoId::new("a")]);
        index.begin_preload(VideoId::new("c"), PathBuf::from("/cache/c.mp4"));

        assert_eq!(
            index.stats(),
            IndexStats {
                entries: 3,
                total_bytes: 12,
                pinned: 2,
                preloading: 1,
            }
        );
    }
}
