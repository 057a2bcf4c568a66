//! Feed window for feedbuf.
//!
//! - `window` - pure window state with staged rotation planning
//! - `feed` - `FeedWindow`: coordinated rotations, catalog fetches, preloads

mod feed;
pub mod window;

pub use feed::{Direction, FeedWindow, FeedWindowDeps, ROTATE_PRIORITY};
pub use window::{Step, WindowState};
