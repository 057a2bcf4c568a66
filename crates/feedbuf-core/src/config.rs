//! Component configuration.
//!
//! Each component takes its own typed config. Values are fixed for the
//! lifetime of the component; build them from `FeedbufSettings` or use the
//! defaults, which match the tuning constants.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Nominal number of videos held by the feed window.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Maximum total size of the disk cache (500 MB).
pub const DEFAULT_MAX_CACHE_BYTES: u64 = 500 * 1024 * 1024;

/// Age after which leftover files are swept at startup (24 h).
pub const DEFAULT_ENTRY_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on the lifetime of any coordinated operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of neighbors preloaded after each rotation.
pub const DEFAULT_PRELOAD_FAN_OUT: usize = 2;

/// How an operation behaves when a resource it needs is held by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceWaitPolicy {
    /// Queue strictly behind every earlier operation on the same resource.
    #[default]
    Fifo,
    /// Attach to the holder's outcome instead of running.
    ///
    /// Falls back to queueing when the holder produces a different result type.
    JoinHolder,
}

/// Configuration for the task coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Timeout applied to every operation.
    pub operation_timeout: Duration,
    /// Behaviour on resource conflicts.
    pub wait_policy: ResourceWaitPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            wait_policy: ResourceWaitPolicy::Fifo,
        }
    }
}

impl CoordinatorConfig {
    /// Set the operation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set the resource wait policy.
    #[must_use]
    pub const fn with_wait_policy(mut self, policy: ResourceWaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }
}

/// Configuration for the disk video cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding cached files. Process-local.
    pub cache_dir: PathBuf,
    /// Size cap enforced by eviction.
    pub max_cache_bytes: u64,
    /// Files older than this are removed by the startup sweep.
    pub entry_max_age: Duration,
}

impl CacheConfig {
    /// Create a config for the given cache directory.
    #[must_use]
    pub const fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            max_cache_bytes: DEFAULT_MAX_CACHE_BYTES,
            entry_max_age: DEFAULT_ENTRY_MAX_AGE,
        }
    }

    /// Set the size cap.
    #[must_use]
    pub const fn with_max_cache_bytes(mut self, bytes: u64) -> Self {
        self.max_cache_bytes = bytes;
        self
    }

    /// Set the startup sweep age.
    #[must_use]
    pub const fn with_entry_max_age(mut self, age: Duration) -> Self {
        self.entry_max_age = age;
        self
    }
}

/// Configuration for the feed window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// Nominal window length.
    pub window_size: usize,
    /// Neighbors preloaded after each rotation, split evenly on both sides.
    pub preload_fan_out: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            preload_fan_out: DEFAULT_PRELOAD_FAN_OUT,
        }
    }
}

impl WindowConfig {
    /// Set the window size.
    #[must_use]
    pub const fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Set the preload fan-out.
    #[must_use]
    pub const fn with_preload_fan_out(mut self, fan_out: usize) -> Self {
        self.preload_fan_out = fan_out;
        self
    }

    /// Distance from the cursor covered by neighbor preloading.
    #[must_use]
    pub const fn neighbor_radius(&self) -> usize {
        self.preload_fan_out.div_ceil(2)
    }
}
