//! Feed window over the remote catalog.
//!
//! # Concurrency Model
//!
//! - Rotations run as coordinator operations locking `Resource::Rotate`; a
//!   second swipe in the same direction joins the one in flight
//! - A rotation stages its next state from a snapshot, awaits the catalog,
//!   and commits with a single assignment; a failed fetch commits nothing
//! - Reads take the `RwLock` briefly and never wait on a rotation
//! - Preloads are spawned and never block a rotation

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use futures_util::future::join_all;

use feedbuf_cache::DiskVideoCache;
use feedbuf_coordinator::{Operation, Resource, TaskCoordinator};
use feedbuf_core::{
    FeedError, FeedResult, RemoteCatalogPort, Video, VideoId, VideoMetadata, VideoWithMetadata,
    WindowConfig,
};

use crate::window::{Step, WindowState};

/// Priority of rotations.
pub const ROTATE_PRIORITY: i32 = 10;

/// Rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards older videos.
    Forward,
    /// Towards newer videos.
    Backward,
}

impl Direction {
    const fn op_name(self) -> &'static str {
        match self {
            Self::Forward => "rotate_forward",
            Self::Backward => "rotate_backward",
        }
    }
}

/// Dependencies of a `FeedWindow`.
#[derive(Clone)]
pub struct FeedWindowDeps {
    /// Scheduler shared with the cache.
    pub coordinator: TaskCoordinator,
    /// Cache that preloads window members.
    pub cache: DiskVideoCache,
    /// Source of further videos.
    pub catalog: Arc<dyn RemoteCatalogPort>,
    /// Window size and preload fan-out.
    pub config: WindowConfig,
}

struct WindowInner {
    coordinator: TaskCoordinator,
    cache: DiskVideoCache,
    catalog: Arc<dyn RemoteCatalogPort>,
    config: WindowConfig,
    state: RwLock<WindowState>,
}

/// Bidirectionally scrollable window over the catalog.
///
/// Cheap to clone; clones share the same window. Must be created from
/// within a tokio runtime.
#[derive(Clone)]
pub struct FeedWindow {
    inner: Arc<WindowInner>,
}

impl FeedWindow {
    /// Build a window from `videos`, pairing each with its metadata.
    ///
    /// Videos without metadata get zero-valued metadata. Every window
    /// member is preloaded in the background.
    pub fn new(
        deps: FeedWindowDeps,
        videos: Vec<Video>,
        metadata: &HashMap<VideoId, VideoMetadata>,
    ) -> Self {
        Self::from_items(deps, WindowState::attach_metadata(videos, metadata))
    }

    /// Build a window from videos that already carry metadata.
    pub fn from_items(deps: FeedWindowDeps, items: Vec<VideoWithMetadata>) -> Self {
        let state = WindowState::centered(items, deps.config.window_size);
        tracing::info!(
            len = state.items().len(),
            cursor = state.cursor(),
            "Feed window created"
        );

        let window = Self {
            inner: Arc::new(WindowInner {
                coordinator: deps.coordinator,
                cache: deps.cache,
                catalog: deps.catalog,
                config: deps.config,
                state: RwLock::new(state),
            }),
        };

        let members: Vec<Video> = {
            let state = window.read();
            window.inner.cache.set_active_videos(state.ids());
            state.items().iter().map(|item| item.video.clone()).collect()
        };
        window.spawn_preload(members);
        window
    }

    /// Build a window from the first catalog page.
    ///
    /// Fails with `InvalidConfig` for a zero window size.
    pub async fn load(deps: FeedWindowDeps) -> FeedResult<Self> {
        if deps.config.window_size == 0 {
            return Err(FeedError::invalid_config("window size must be at least 1"));
        }
        let page = deps
            .catalog
            .fetch_page(deps.config.window_size, None)
            .await?;
        tracing::debug!(
            videos = page.videos.len(),
            has_more = page.has_more,
            "Fetched first catalog page"
        );
        Ok(Self::from_items(deps, page.videos))
    }

    /// The video under the cursor, or `None` for an empty window.
    pub fn current_video(&self) -> Option<VideoWithMetadata> {
        self.read().current().cloned()
    }

    /// All window members in feed order.
    pub fn all_videos(&self) -> Vec<VideoWithMetadata> {
        self.read().items().to_vec()
    }

    /// Index of the current video within the window.
    pub fn current_index(&self) -> usize {
        self.read().cursor()
    }

    /// Whether the catalog reported nothing before the first member.
    pub fn is_at_start(&self) -> bool {
        self.read().at_start()
    }

    /// Whether the catalog reported nothing after the last member.
    pub fn is_at_end(&self) -> bool {
        self.read().at_end()
    }

    /// The window configuration.
    pub fn config(&self) -> &WindowConfig {
        &self.inner.config
    }

    /// Move to the next video, fetching one more from the catalog when past
    /// the midpoint.
    ///
    /// Does nothing once the end of the catalog was reached. A failed fetch
    /// leaves the window unchanged.
    pub async fn rotate_forward(&self) -> FeedResult<()> {
        self.rotate(Direction::Forward).await
    }

    /// Move to the previous video, fetching one more from the catalog when
    /// before the midpoint.
    ///
    /// Does nothing once the start of the catalog was reached. A failed
    /// fetch leaves the window unchanged.
    pub async fn rotate_backward(&self) -> FeedResult<()> {
        self.rotate(Direction::Backward).await
    }

    async fn rotate(&self, direction: Direction) -> FeedResult<()> {
        let window = self.clone();
        let op = Operation::new(direction.op_name())
            .priority(ROTATE_PRIORITY)
            .resource(Resource::Rotate);
        self.inner
            .coordinator
            .enqueue(op, move || async move { window.step(direction).await })
            .await
    }

    /// Body of a rotation. Runs while holding `Resource::Rotate`.
    async fn step(&self, direction: Direction) -> FeedResult<()> {
        let snapshot = self.read().clone();
        let step = match direction {
            Direction::Forward => snapshot.plan_forward(),
            Direction::Backward => snapshot.plan_backward(),
        };

        let next = match (step, direction) {
            (Step::Idle, _) => {
                tracing::debug!(?direction, "Rotation skipped at boundary");
                return Ok(());
            }
            (Step::Move, Direction::Forward) => snapshot.moved_forward(),
            (Step::Move, Direction::Backward) => snapshot.moved_backward(),
            (Step::Fetch { anchor }, Direction::Forward) => {
                let fetched = self.inner.catalog.fetch_videos_after(1, &anchor).await?;
                match fetched.into_iter().next() {
                    Some(item) => snapshot.extended_forward(item),
                    None => {
                        tracing::info!(after = %anchor, "Reached end of catalog");
                        snapshot.reached_end()
                    }
                }
            }
            (Step::Fetch { anchor }, Direction::Backward) => {
                let fetched = self.inner.catalog.fetch_videos_before(1, &anchor).await?;
                match fetched.into_iter().last() {
                    Some(item) => snapshot.extended_backward(item),
                    None => {
                        tracing::info!(before = %anchor, "Reached start of catalog");
                        snapshot.reached_start()
                    }
                }
            }
        };

        self.commit(next, direction);
        Ok(())
    }

    fn commit(&self, next: WindowState, direction: Direction) {
        let moved = {
            let current = self.read();
            next.cursor() != current.cursor() || next.items() != current.items()
        };
        let neighbors: Vec<Video> = next
            .neighbors(self.inner.config.neighbor_radius())
            .into_iter()
            .map(|item| item.video.clone())
            .collect();
        let ids = next.ids();

        tracing::info!(
            ?direction,
            cursor = next.cursor(),
            current = %next.current().map_or("-", |item| item.id().as_str()),
            at_start = next.at_start(),
            at_end = next.at_end(),
            "Rotation committed"
        );
        *self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;

        if moved {
            self.inner.cache.set_active_videos(ids);
            self.spawn_preload(neighbors);
        }
    }

    /// Preload `videos` in the background, logging failures.
    fn spawn_preload(&self, videos: Vec<Video>) {
        let cache = self.inner.cache.clone();
        tokio::spawn(async move {
            let results = join_all(videos.iter().map(|video| cache.preload_video(video))).await;
            for (video, result) in videos.iter().zip(results) {
                if let Err(e) = result {
                    tracing::warn!(video_id = %video.id, error = %e, "Preload failed");
                }
            }
        });
    }

    fn read(&self) -> RwLockReadGuard<'_, WindowState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FeedWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("FeedWindow")
            .field("ids", &state.ids())
            .field("cursor", &state.cursor())
            .field("at_start", &state.at_start())
            .field("at_end", &state.at_end())
            .finish_non_exhaustive()
    }
}
