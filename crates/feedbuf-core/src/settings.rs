//! Settings domain types and validation.
//!
//! Settings are the user-facing, partially-specified form of configuration
//! (typically loaded from a JSON file). Missing fields fall back to the
//! tuning constants in [`crate::config`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{
    CacheConfig, CoordinatorConfig, DEFAULT_ENTRY_MAX_AGE, DEFAULT_MAX_CACHE_BYTES,
    DEFAULT_OPERATION_TIMEOUT, DEFAULT_PRELOAD_FAN_OUT, DEFAULT_WINDOW_SIZE, ResourceWaitPolicy,
    WindowConfig,
};
use crate::paths::{PathError, default_cache_dir};

/// Application settings structure.
///
/// All fields are optional to support partial files and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedbufSettings {
    /// Directory for cached video files.
    pub cache_dir: Option<String>,

    /// Number of videos held by the feed window.
    pub window_size: Option<usize>,

    /// Disk cache cap in bytes.
    pub max_cache_bytes: Option<u64>,

    /// Startup sweep age in seconds.
    pub entry_max_age_secs: Option<u64>,

    /// Per-operation timeout in seconds.
    pub operation_timeout_secs: Option<u64>,

    /// Neighbors preloaded per rotation.
    pub preload_fan_out: Option<usize>,

    /// Coordinator behaviour on resource conflicts.
    pub resource_wait_policy: Option<ResourceWaitPolicy>,
}

impl FeedbufSettings {
    /// Parse settings from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(text).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Load settings from a JSON file and validate them.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let settings = Self::from_json(&text)?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Get the effective window size.
    #[must_use]
    pub fn effective_window_size(&self) -> usize {
        self.window_size.unwrap_or(DEFAULT_WINDOW_SIZE)
    }

    /// Get the effective cache cap.
    #[must_use]
    pub fn effective_max_cache_bytes(&self) -> u64 {
        self.max_cache_bytes.unwrap_or(DEFAULT_MAX_CACHE_BYTES)
    }

    /// Get the effective startup sweep age.
    #[must_use]
    pub fn effective_entry_max_age(&self) -> Duration {
        self.entry_max_age_secs
            .map_or(DEFAULT_ENTRY_MAX_AGE, Duration::from_secs)
    }

    /// Get the effective operation timeout.
    #[must_use]
    pub fn effective_operation_timeout(&self) -> Duration {
        self.operation_timeout_secs
            .map_or(DEFAULT_OPERATION_TIMEOUT, Duration::from_secs)
    }

    /// Get the effective preload fan-out.
    #[must_use]
    pub fn effective_preload_fan_out(&self) -> usize {
        self.preload_fan_out.unwrap_or(DEFAULT_PRELOAD_FAN_OUT)
    }

    /// Build the coordinator config.
    #[must_use]
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_timeout(self.effective_operation_timeout())
            .with_wait_policy(self.resource_wait_policy.unwrap_or_default())
    }

    /// Resolve the cache directory: `explicit` first, then the configured
    /// directory, then the platform default.
    pub fn resolve_cache_dir(&self, explicit: Option<PathBuf>) -> Result<PathBuf, PathError> {
        match explicit.or_else(|| self.cache_dir.as_deref().map(PathBuf::from)) {
            Some(dir) => Ok(dir),
            None => default_cache_dir(),
        }
    }

    /// Build the cache config for an already resolved `cache_dir`.
    #[must_use]
    pub fn cache_config(&self, cache_dir: PathBuf) -> CacheConfig {
        CacheConfig::new(cache_dir)
            .with_max_cache_bytes(self.effective_max_cache_bytes())
            .with_entry_max_age(self.effective_entry_max_age())
    }

    /// Build the window config.
    #[must_use]
    pub fn window_config(&self) -> WindowConfig {
        WindowConfig::default()
            .with_window_size(self.effective_window_size())
            .with_preload_fan_out(self.effective_preload_fan_out())
    }
}

/// Settings loading and validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Window size must be at least 1, got {0}")]
    InvalidWindowSize(usize),

    #[error("Cache size cap must be greater than zero")]
    ZeroCacheSize,

    #[error("Operation timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Cache directory cannot be empty")]
    EmptyCacheDir,

    #[error("Failed to read settings file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse settings: {0}")]
    Parse(String),
}

/// Validate settings values.
pub fn validate_settings(settings: &FeedbufSettings) -> Result<(), SettingsError> {
    if let Some(size) = settings.window_size {
        if size == 0 {
            return Err(SettingsError::InvalidWindowSize(size));
        }
    }

    if settings.max_cache_bytes == Some(0) {
        return Err(SettingsError::ZeroCacheSize);
    }

    if settings.operation_timeout_secs == Some(0) {
        return Err(SettingsError::ZeroTimeout);
    }

    if settings
        .cache_dir
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyCacheDir);
    }

    Ok(())
}
