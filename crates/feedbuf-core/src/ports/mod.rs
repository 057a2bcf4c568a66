//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No HTTP client or backend SDK types in any signature
//! - Failures are reported as `FeedError`
//! - Async ports use `async_trait` and are object safe

pub mod cache_event_emitter;
pub mod catalog;
pub mod fetcher;

pub use cache_event_emitter::{CacheEventEmitterPort, NoopCacheEmitter};
pub use catalog::RemoteCatalogPort;
pub use fetcher::{ProgressFn, VideoFetcherPort};
