//! Domain types shared by every feedbuf component.

mod cache_entry;
mod video;

pub use cache_entry::CacheEntry;
pub use video::{CatalogPage, Video, VideoId, VideoMetadata, VideoWithMetadata};
