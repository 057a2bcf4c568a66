//! Path utilities for the video cache directory.
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive I/O; callers decide whether to create directories

mod cache;
mod ensure;
mod error;

pub use cache::{DEFAULT_CACHE_DIR_RELATIVE, default_cache_dir};
pub use ensure::{DirectoryCreationStrategy, ensure_directory, verify_writable};
pub use error::PathError;
