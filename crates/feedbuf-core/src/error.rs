//! Error taxonomy for the feed buffering subsystem.
//!
//! Errors are cloneable and serializable: a single outcome is delivered to
//! every caller that joined the same in-flight operation. I/O errors are
//! captured as kind and message strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for coordinator, cache and feed window operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeedError {
    /// A video could not be referenced (no remote URL). No I/O was attempted.
    #[error("Invalid video reference: {video_id}")]
    InvalidVideoReference {
        /// The offending video id.
        video_id: String,
    },

    /// Downloading a video failed. No cache entry was left behind.
    #[error("Download of {video_id} failed: {message}")]
    DownloadFailed {
        /// The video being downloaded.
        video_id: String,
        /// Detailed error message.
        message: String,
    },

    /// A scheduled operation exceeded the coordinator timeout.
    #[error("Operation {operation} timed out after {timeout_ms} ms")]
    OperationTimedOut {
        /// Operation id.
        operation: String,
        /// The timeout that was exceeded.
        timeout_ms: u64,
    },

    /// A scheduled operation failed without a more specific error (e.g. it panicked).
    #[error("Operation {operation} failed: {message}")]
    OperationFailed {
        /// Operation id.
        operation: String,
        /// Detailed error message.
        message: String,
    },

    /// The remote catalog could not be queried.
    #[error("Catalog fetch failed: {message}")]
    CatalogFetchFailed {
        /// Detailed error message.
        message: String,
    },

    /// The coordinator was reset while the operation was waiting or running.
    #[error("Operation {operation} dropped by coordinator reset")]
    CoordinatorReset {
        /// Operation id.
        operation: String,
    },

    /// I/O error during file operations.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "`NotFound`").
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong.
        message: String,
    },
}

impl FeedError {
    /// Create an invalid video reference error.
    pub fn invalid_video_reference(video_id: impl Into<String>) -> Self {
        Self::InvalidVideoReference {
            video_id: video_id.into(),
        }
    }

    /// Create a download failed error.
    pub fn download_failed(video_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            video_id: video_id.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timed_out(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::OperationTimedOut {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a catalog fetch error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::CatalogFetchFailed {
            message: message.into(),
        }
    }

    /// Create a coordinator reset error.
    pub fn reset(operation: impl Into<String>) -> Self {
        Self::CoordinatorReset {
            operation: operation.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Check if re-issuing the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DownloadFailed { .. }
                | Self::OperationTimedOut { .. }
                | Self::CatalogFetchFailed { .. }
                | Self::CoordinatorReset { .. }
                | Self::Io { .. }
        )
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(&err)
    }
}

/// Convenience result type for feedbuf operations.
pub type FeedResult<T> = Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        match FeedError::from(io_err) {
            FeedError::Io { kind, message } => {
                assert_eq!(kind, "PermissionDenied");
                assert!(message.contains("denied"));
            }
            other => panic!("Expected Io variant, got {other:?}"),
        }
    }

    #[test]
    fn test_error_serialization() {
        let err = FeedError::timed_out("preload_v1", 30_000);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("preload_v1"));

        let parsed: FeedError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_is_retryable() {
        assert!(FeedError::download_failed("v1", "connection reset").is_retryable());
        assert!(FeedError::timed_out("rotate_forward", 10).is_retryable());
        assert!(!FeedError::invalid_video_reference("v1").is_retryable());
        assert!(!FeedError::operation_failed("op", "panicked").is_retryable());
    }

    #[test]
    fn test_display_mentions_video() {
        let err = FeedError::download_failed("clip-9", "HTTP 503");
        assert_eq!(err.to_string(), "Download of clip-9 failed: HTTP 503");
    }
}
