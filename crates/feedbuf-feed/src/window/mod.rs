//! Feed window state.
//!
//! This module provides a pure state machine over the visible window of a
//! feed. No I/O is performed here; `FeedWindow` performs the catalog fetch a
//! step asks for and commits the resulting state in one assignment.
//!
//! # Rotation
//!
//! - A forward step past the midpoint (or off the last item) needs one more
//!   video after the last item; the oldest item is dropped to keep the
//!   window at capacity and the cursor compensates for the shift
//! - Backward is the mirror image: before the midpoint it needs one video
//!   preceding the first item, prepended while the last item is dropped
//! - When the catalog has nothing more, the matching sentinel is set and
//!   the cursor still moves if it can; once it sits on the edge item,
//!   further steps in that direction do nothing

use std::collections::HashMap;

use feedbuf_core::{Video, VideoId, VideoMetadata, VideoWithMetadata};

/// What a rotation needs before it can be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing to do (sentinel set or empty window).
    Idle,
    /// Move the cursor within the window.
    Move,
    /// Fetch one video adjacent to `anchor` first.
    Fetch {
        /// Last item (forward) or first item (backward).
        anchor: VideoId,
    },
}

/// Snapshot of the feed window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowState {
    items: Vec<VideoWithMetadata>,
    cursor: usize,
    at_start: bool,
    at_end: bool,
    capacity: usize,
}

impl WindowState {
    /// Build a window of at most `capacity` items centered on the middle of `items`.
    ///
    /// The cursor starts in the middle of the window.
    pub fn centered(mut items: Vec<VideoWithMetadata>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        if items.len() > capacity {
            let start = (items.len() / 2)
                .saturating_sub(capacity / 2)
                .min(items.len() - capacity);
            items.drain(..start);
            items.truncate(capacity);
        }
        let cursor = items.len() / 2;
        Self {
            items,
            cursor,
            at_start: false,
            at_end: false,
            capacity,
        }
    }

    /// Pair `videos` with their metadata, defaulting missing metadata to zero counts.
    pub fn attach_metadata(
        videos: Vec<Video>,
        metadata: &HashMap<VideoId, VideoMetadata>,
    ) -> Vec<VideoWithMetadata> {
        videos
            .into_iter()
            .map(|video| {
                let meta = metadata.get(&video.id).cloned().unwrap_or_default();
                VideoWithMetadata::new(video, meta)
            })
            .collect()
    }

    /// Window items in feed order.
    pub fn items(&self) -> &[VideoWithMetadata] {
        &self.items
    }

    /// Ids of the window items.
    pub fn ids(&self) -> Vec<VideoId> {
        self.items.iter().map(|item| item.id().clone()).collect()
    }

    /// Index of the current item.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// The item under the cursor, if the window is not empty.
    pub fn current(&self) -> Option<&VideoWithMetadata> {
        self.items.get(self.cursor)
    }

    /// Whether the catalog reported nothing before the first item.
    pub const fn at_start(&self) -> bool {
        self.at_start
    }

    /// Whether the catalog reported nothing after the last item.
    pub const fn at_end(&self) -> bool {
        self.at_end
    }

    /// Target window length.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items within `radius` of the cursor, excluding the current one.
    pub fn neighbors(&self, radius: usize) -> Vec<&VideoWithMetadata> {
        let lo = self.cursor.saturating_sub(radius);
        let hi = (self.cursor + radius).min(self.items.len().saturating_sub(1));
        (lo..=hi)
            .filter(|i| *i != self.cursor)
            .filter_map(|i| self.items.get(i))
            .collect()
    }

    fn midpoint(&self) -> usize {
        self.items.len() / 2
    }

    fn on_last(&self) -> bool {
        self.cursor + 1 >= self.items.len()
    }

    /// Decide what a forward rotation needs.
    ///
    /// Past the end of the catalog the cursor keeps moving through the
    /// remaining items without fetching.
    pub fn plan_forward(&self) -> Step {
        let Some(last) = self.items.last() else {
            return Step::Idle;
        };
        if self.at_end {
            if self.on_last() { Step::Idle } else { Step::Move }
        } else if self.on_last() || self.cursor > self.midpoint() {
            Step::Fetch {
                anchor: last.id().clone(),
            }
        } else {
            Step::Move
        }
    }

    /// Decide what a backward rotation needs.
    pub fn plan_backward(&self) -> Step {
        let Some(first) = self.items.first() else {
            return Step::Idle;
        };
        if self.at_start {
            if self.cursor == 0 { Step::Idle } else { Step::Move }
        } else if self.cursor == 0 || self.cursor < self.midpoint() {
            Step::Fetch {
                anchor: first.id().clone(),
            }
        } else {
            Step::Move
        }
    }

    /// Advance the cursor by one and clear `at_start`.
    #[must_use]
    pub fn moved_forward(&self) -> Self {
        let mut next = self.clone();
        next.cursor = (next.cursor + 1).min(next.items.len().saturating_sub(1));
        next.at_start = false;
        next
    }

    /// Move the cursor back by one and clear `at_end`.
    #[must_use]
    pub fn moved_backward(&self) -> Self {
        let mut next = self.clone();
        next.cursor = next.cursor.saturating_sub(1);
        next.at_end = false;
        next
    }

    /// Append `item`, drop the oldest item when full, then advance.
    #[must_use]
    pub fn extended_forward(&self, item: VideoWithMetadata) -> Self {
        let mut next = self.clone();
        next.items.push(item);
        if next.items.len() > next.capacity {
            next.items.remove(0);
            next.cursor = next.cursor.saturating_sub(1);
        }
        next.moved_forward()
    }

    /// Prepend `item`, drop the newest item when full, then move back.
    #[must_use]
    pub fn extended_backward(&self, item: VideoWithMetadata) -> Self {
        let mut next = self.clone();
        next.items.insert(0, item);
        next.cursor += 1;
        if next.items.len() > next.capacity {
            next.items.pop();
        }
        next.moved_backward()
    }

    /// Record that nothing follows the last item, advancing unless the
    /// cursor is already on it.
    #[must_use]
    pub fn reached_end(&self) -> Self {
        let next = Self {
            at_end: true,
            ..self.clone()
        };
        if next.on_last() { next } else { next.moved_forward() }
    }

    /// Record that nothing precedes the first item, moving back unless the
    /// cursor is already on it.
    #[must_use]
    pub fn reached_start(&self) -> Self {
        let next = Self {
            at_start: true,
            ..self.clone()
        };
        if next.cursor == 0 { next } else { next.moved_backward() }
    }
}
