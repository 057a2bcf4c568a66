//! Cache event emitter port.
//!
//! This port abstracts cache event emission, allowing the disk cache to
//! report downloads and evictions without coupling to a transport.

use crate::events::CacheEvent;

/// Port for emitting cache events.
///
/// This method should not block.
pub trait CacheEventEmitterPort: Send + Sync {
    /// Emit a cache event.
    fn emit(&self, event: CacheEvent);
}

/// A no-op cache event emitter for tests and CLI contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopCacheEmitter;

impl NoopCacheEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CacheEventEmitterPort for NoopCacheEmitter {
    fn emit(&self, _event: CacheEvent) {
        // Intentionally do nothing
    }
}
