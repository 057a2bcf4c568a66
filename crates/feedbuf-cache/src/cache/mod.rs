//! Disk video cache.
//!
//! Maps video ids to local files, downloading each video at most once and
//! keeping the directory under a size cap without touching the active set.
//!
//! # Concurrency Model
//!
//! - Every mutation runs inside a `TaskCoordinator` operation:
//!   downloads lock `Resource::Video`, eviction and clearing lock
//!   `Resource::CacheCleanup`, first-time setup locks `Resource::CacheInit`
//! - Bookkeeping lives in a `CacheIndex` behind a std `Mutex` that is never
//!   held across an `.await`
//! - Deletions re-check the active set immediately before removing a file

mod paths;
mod sweep;

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use feedbuf_core::{
    CacheConfig, CacheEntry, CacheEvent, CacheEventEmitterPort, DirectoryCreationStrategy,
    FeedError, FeedResult, Video, VideoFetcherPort, VideoId, ensure_directory,
};
use feedbuf_coordinator::{Operation, Resource, TaskCoordinator};

use crate::index::CacheIndex;
use crate::progress::ProgressMilestones;

pub use paths::{CacheFileKind, CacheFiles, classify};
pub use sweep::{SweepReport, sweep_directory};

use sweep::remove_cache_file;

/// Priority of first-time initialization and explicit sweeps.
pub const INIT_PRIORITY: i32 = 20;

/// Priority of eviction and clearing.
pub const CLEANUP_PRIORITY: i32 = 5;

/// Priority of downloads.
pub const PRELOAD_PRIORITY: i32 = 0;

/// Point-in-time numbers for a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries in the index, including in-flight downloads.
    pub entries: usize,
    /// Sum of entry sizes.
    pub total_bytes: u64,
    /// Size cap enforced by eviction.
    pub max_bytes: u64,
    /// Entries exempt from eviction.
    pub pinned: usize,
    /// Downloads in flight.
    pub preloading: usize,
    /// Size of the active set.
    pub active: usize,
    /// Whether the startup sweep has run.
    pub initialized: bool,
}

/// Dependencies of a `DiskVideoCache`.
#[derive(Clone)]
pub struct CacheDeps {
    /// Scheduler shared with the rest of the subsystem.
    pub coordinator: TaskCoordinator,
    /// Transport for remote videos.
    pub fetcher: Arc<dyn VideoFetcherPort>,
    /// Sink for cache events.
    pub emitter: Arc<dyn CacheEventEmitterPort>,
    /// Directory and limits.
    pub config: CacheConfig,
}

#[derive(Default)]
struct CacheState {
    index: CacheIndex,
    initialized: bool,
}

struct CacheInner {
    coordinator: TaskCoordinator,
    fetcher: Arc<dyn VideoFetcherPort>,
    emitter: Arc<dyn CacheEventEmitterPort>,
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops the in-flight placeholder of a download that did not complete,
/// including one whose future was dropped by a timeout.
struct PreloadGuard<'a> {
    inner: &'a CacheInner,
    id: &'a VideoId,
    armed: bool,
}

impl<'a> PreloadGuard<'a> {
    fn new(inner: &'a CacheInner, id: &'a VideoId) -> Self {
        Self {
            inner,
            id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PreloadGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.inner.lock().index.abort_preload(self.id) {
            tracing::debug!(video_id = %self.id, "Dropped placeholder of unfinished download");
        }
    }
}

/// Size-bounded store of downloaded videos.
///
/// Cheap to clone; clones share the same index and directory.
#[derive(Clone)]
pub struct DiskVideoCache {
    inner: Arc<CacheInner>,
}

impl DiskVideoCache {
    /// Create a cache. Nothing touches the disk until the first preload.
    pub fn new(deps: CacheDeps) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                coordinator: deps.coordinator,
                fetcher: deps.fetcher,
                emitter: deps.emitter,
                config: deps.config,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// The cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return a playable local path for `video`, downloading it if needed.
    ///
    /// Concurrent calls for the same id share one download. A video without
    /// a remote URL fails with `InvalidVideoReference` before any I/O. A
    /// failed download leaves neither an entry nor a partial file behind.
    ///
    /// The size-limit pass that follows keeps the new file only while it fits
    /// under the cap or is active. An inactive download larger than the cap
    /// is evicted before this returns, so the path may no longer exist.
    pub async fn preload_video(&self, video: &Video) -> FeedResult<PathBuf> {
        if !video.has_remote_url() {
            return Err(FeedError::invalid_video_reference(video.id.as_str()));
        }
        self.ensure_initialized().await;

        let cache = self.clone();
        let target = video.clone();
        let op = Operation::new(format!("preload_{}", video.id))
            .priority(PRELOAD_PRIORITY)
            .resource(Resource::Video(video.id.clone()));
        let path = self
            .inner
            .coordinator
            .enqueue(op, move || async move { cache.load_or_download(&target).await })
            .await?;

        if let Err(e) = self.evict_to_limit(&video.id).await {
            tracing::warn!(video_id = %video.id, error = %e, "Size limit pass failed");
        }
        Ok(path)
    }

    /// Look up a completed download without starting one.
    pub async fn get_cached_uri(&self, id: &VideoId) -> Option<PathBuf> {
        let path = {
            let state = self.inner.lock();
            state
                .index
                .get(id)
                .filter(|e| !e.is_preloading)
                .map(|e| e.local_path.clone())?
        };
        tokio::fs::try_exists(&path)
            .await
            .unwrap_or(false)
            .then_some(path)
    }

    /// Replace the active set and schedule eviction of everything outside it.
    ///
    /// The returned handle resolves once the eviction pass has finished;
    /// callers may drop it.
    pub fn set_active_videos<I>(&self, ids: I) -> JoinHandle<()>
    where
        I: IntoIterator<Item = VideoId>,
    {
        let active = {
            let mut state = self.inner.lock();
            state.index.set_active(ids);
            state.index.active().len()
        };
        tracing::debug!(active, "Active set replaced");

        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.optimize_cache().await {
                tracing::warn!(error = %e, "Cache optimization failed");
            }
        })
    }

    /// Evict every entry outside the active set that is not downloading.
    ///
    /// Returns the number of entries evicted.
    pub async fn optimize_cache(&self) -> FeedResult<usize> {
        let cache = self.clone();
        let op = Operation::new("optimize_cache")
            .priority(CLEANUP_PRIORITY)
            .resource(Resource::CacheCleanup);
        self.inner
            .coordinator
            .enqueue(op, move || async move {
                let plan = cache.inner.lock().index.plan_inactive_eviction();
                Ok(cache.evict(plan).await)
            })
            .await
    }

    /// Delete every cache file and forget every completed entry.
    ///
    /// Returns the number of files removed.
    pub async fn clear_cache(&self) -> FeedResult<usize> {
        let cache = self.clone();
        let op = Operation::new("clear_cache")
            .priority(CLEANUP_PRIORITY)
            .resource(Resource::CacheCleanup);
        self.inner
            .coordinator
            .enqueue(op, move || async move { cache.remove_all_files().await })
            .await
    }

    /// Sweep the directory now, keeping only files of pinned ids that are
    /// younger than the configured max age.
    pub async fn sweep(&self) -> FeedResult<SweepReport> {
        let cache = self.clone();
        let op = Operation::new("cache_sweep")
            .priority(INIT_PRIORITY)
            .resource(Resource::CacheInit)
            .resource(Resource::CacheCleanup);
        self.inner
            .coordinator
            .enqueue(op, move || async move { cache.sweep_now().await })
            .await
    }

    /// Get a snapshot of the index.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        let index = state.index.stats();
        CacheStats {
            entries: index.entries,
            total_bytes: index.total_bytes,
            max_bytes: self.inner.config.max_cache_bytes,
            pinned: index.pinned,
            preloading: index.preloading,
            active: state.index.active().len(),
            initialized: state.initialized,
        }
    }

    /// Run the startup sweep once. Failures are logged and the cache keeps
    /// working uninitialized.
    async fn ensure_initialized(&self) {
        if self.inner.lock().initialized {
            return;
        }

        let cache = self.clone();
        let op = Operation::new("cache_init")
            .priority(INIT_PRIORITY)
            .resource(Resource::CacheInit);
        let result = self
            .inner
            .coordinator
            .enqueue(op, move || async move { cache.initialize().await })
            .await;

        if let Err(e) = result {
            tracing::warn!(
                cache_dir = %self.inner.config.cache_dir.display(),
                error = %e,
                "Cache initialization failed, continuing without startup sweep"
            );
        }
    }

    async fn initialize(&self) -> FeedResult<()> {
        if self.inner.lock().initialized {
            return Ok(());
        }

        let dir = self.inner.config.cache_dir.clone();
        tokio::task::spawn_blocking(move || {
            ensure_directory(&dir, DirectoryCreationStrategy::AutoCreate)
        })
        .await
        .map_err(|e| FeedError::operation_failed("cache_init", e.to_string()))??;
        self.sweep_now().await?;
        self.inner.lock().initialized = true;
        Ok(())
    }

    async fn sweep_now(&self) -> FeedResult<SweepReport> {
        let keep = self.inner.lock().index.pinned_ids();
        let report =
            sweep_directory(&self.inner.config.cache_dir, &keep, self.inner.config.entry_max_age)
                .await?;

        {
            let mut state = self.inner.lock();
            let removed: HashSet<&Path> = report.removed.iter().map(PathBuf::as_path).collect();
            let stale: Vec<VideoId> = state
                .index
                .plan_inactive_eviction()
                .into_iter()
                .filter(|id| {
                    state
                        .index
                        .get(id)
                        .is_some_and(|e| removed.contains(e.local_path.as_path()))
                })
                .collect();
            for id in &stale {
                state.index.remove(id);
            }
            for entry in &report.adopted {
                if state.index.get(&entry.video_id).is_none() {
                    state.index.complete(entry.clone());
                }
            }
        }

        tracing::info!(
            cache_dir = %self.inner.config.cache_dir.display(),
            removed = report.removed.len(),
            adopted = report.adopted.len(),
            kept_partial = report.kept_partial,
            "Cache directory swept"
        );
        Ok(report)
    }

    /// Body of a preload operation. Runs under `video_{id}`.
    async fn load_or_download(&self, video: &Video) -> FeedResult<PathBuf> {
        let id = &video.id;
        let files = CacheFiles::plan(&self.inner.config.cache_dir, id);

        if let Some(size) = file_len(&files.complete).await {
            let mut state = self.inner.lock();
            if state.index.hit(id).is_none() {
                state
                    .index
                    .complete(CacheEntry::new(id.clone(), files.complete.clone(), size));
            }
            tracing::debug!(video_id = %id, "Cache hit");
            return Ok(files.complete);
        }

        let resume_from = file_len(&files.partial).await.unwrap_or(0);
        {
            let mut state = self.inner.lock();
            // An entry whose file vanished is replaced by the placeholder.
            state.index.begin_preload(id.clone(), files.complete.clone());
        }
        let guard = PreloadGuard::new(&self.inner, id);

        self.inner.emitter.emit(CacheEvent::DownloadStarted {
            video_id: id.clone(),
            resumed_from: resume_from,
        });
        tracing::info!(video_id = %id, resume_from, "Downloading video");

        match self.download(video, &files, resume_from).await {
            Ok(size_bytes) => {
                guard.disarm();
                self.inner
                    .lock()
                    .index
                    .complete(CacheEntry::new(id.clone(), files.complete.clone(), size_bytes));
                self.inner.emitter.emit(CacheEvent::DownloadCompleted {
                    video_id: id.clone(),
                    size_bytes,
                });
                tracing::info!(video_id = %id, bytes = size_bytes, "Download complete");
                Ok(files.complete)
            }
            Err(e) => {
                drop(guard);
                remove_cache_file(&files.partial).await;

                let message = match e {
                    FeedError::DownloadFailed { message, .. } | FeedError::Io { message, .. } => {
                        message
                    }
                    other => other.to_string(),
                };
                self.inner.emitter.emit(CacheEvent::DownloadFailed {
                    video_id: id.clone(),
                    error: message.clone(),
                });
                tracing::warn!(video_id = %id, error = %message, "Download failed");
                Err(FeedError::download_failed(id.as_str(), message))
            }
        }
    }

    /// Fetch into the partial file and move it into place.
    async fn download(&self, video: &Video, files: &CacheFiles, resume_from: u64) -> FeedResult<u64> {
        let id = &video.id;
        let emitter = &self.inner.emitter;
        let milestones = Mutex::new(ProgressMilestones::default());
        let progress = |downloaded: u64, total: Option<u64>| {
            let crossed = milestones
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .observe(downloaded, total);
            if let Some(percent) = crossed {
                tracing::debug!(video_id = %id, percent, "Download progress");
                emitter.emit(CacheEvent::DownloadProgress {
                    video_id: id.clone(),
                    downloaded,
                    total,
                    percent,
                });
            }
        };

        self.inner
            .fetcher
            .fetch_to_path(&video.remote_url, &files.partial, resume_from, &progress)
            .await?;
        tokio::fs::rename(&files.partial, &files.complete).await?;
        Ok(tokio::fs::metadata(&files.complete).await?.len())
    }

    /// Run a size-limit pass after downloading `protect`, which stays unless it
    /// alone exceeds the cap.
    async fn evict_to_limit(&self, protect: &VideoId) -> FeedResult<usize> {
        let op = Operation::new(format!("evict_after_{protect}"))
            .priority(CLEANUP_PRIORITY)
            .resource(Resource::CacheCleanup);

        let cache = self.clone();
        let protect = protect.clone();
        self.inner
            .coordinator
            .enqueue(op, move || async move {
                let plan = {
                    let state = cache.inner.lock();
                    state
                        .index
                        .plan_size_eviction(cache.inner.config.max_cache_bytes, Some(&protect))
                };
                Ok(cache.evict(plan).await)
            })
            .await
    }

    /// Delete planned entries that are still evictable. Runs under `cache_cleanup`.
    async fn evict(&self, plan: Vec<VideoId>) -> usize {
        let mut evicted = 0;
        for id in plan {
            let entry = {
                let mut state = self.inner.lock();
                if !state.index.is_evictable(&id) {
                    continue;
                }
                state.index.remove(&id)
            };
            let Some(entry) = entry else { continue };

            // Dropped from the index even if the file cannot be deleted.
            remove_cache_file(&entry.local_path).await;
            evicted += 1;
            self.inner.emitter.emit(CacheEvent::Evicted {
                video_id: entry.video_id.clone(),
                size_bytes: entry.size_bytes,
            });
            tracing::info!(video_id = %entry.video_id, bytes = entry.size_bytes, "Evicted cache entry");
        }
        evicted
    }

    /// Body of `clear_cache`. Runs under `cache_cleanup`.
    async fn remove_all_files(&self) -> FeedResult<usize> {
        let dir = &self.inner.config.cache_dir;
        let mut removed = 0;

        match tokio::fs::read_dir(dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    let owned = entry.file_name().to_str().and_then(classify).is_some();
                    if owned && remove_cache_file(&entry.path()).await {
                        removed += 1;
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let forgotten = self.inner.lock().index.clear_completed().len();
        self.inner.emitter.emit(CacheEvent::Cleared {
            files_removed: removed,
        });
        tracing::info!(files_removed = removed, entries = forgotten, "Cache cleared");
        Ok(removed)
    }
}

impl std::fmt::Debug for DiskVideoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskVideoCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Size of a regular file, or `None` if it does not exist.
async fn file_len(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(std::fs::Metadata::is_file)
        .map(|m| m.len())
}
