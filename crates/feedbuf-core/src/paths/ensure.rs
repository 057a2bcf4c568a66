//! Directory creation and verification utilities.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use super::error::PathError;

/// Name of the marker file used to check writability.
const WRITE_MARKER: &str = ".feedbuf_write_test";

/// Strategy for how to handle missing directories when ensuring they exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryCreationStrategy {
    /// Create directories automatically if they are missing.
    #[default]
    AutoCreate,
    /// Do not create directories; return an error if missing.
    Disallow,
}

/// Ensure the provided directory exists and is writable according to the chosen strategy.
pub fn ensure_directory(path: &Path, strategy: DirectoryCreationStrategy) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
    } else {
        match strategy {
            DirectoryCreationStrategy::AutoCreate => {
                fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            }
            DirectoryCreationStrategy::Disallow => {
                return Err(PathError::DirectoryNotFound(path.to_path_buf()));
            }
        }
    }

    verify_writable(path)
}

/// Verify a directory is writable by creating and removing a marker file.
pub fn verify_writable(path: &Path) -> Result<(), PathError> {
    let marker = path.join(WRITE_MARKER);
    let not_writable = |reason: String| PathError::NotWritable {
        path: path.to_path_buf(),
        reason,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&marker)
        .map_err(|e| not_writable(e.to_string()))?;
    file.write_all(b"test")
        .map_err(|e| not_writable(e.to_string()))?;
    drop(file);
    let _ = fs::remove_file(&marker);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_create_nested() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        ensure_directory(&nested, DirectoryCreationStrategy::AutoCreate).unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join(WRITE_MARKER).exists());
    }

    #[test]
    fn test_disallow_missing() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("missing");
        assert!(matches!(
            ensure_directory(&missing, DirectoryCreationStrategy::Disallow),
            Err(PathError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("plain");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            ensure_directory(&file, DirectoryCreationStrategy::AutoCreate),
            Err(PathError::NotADirectory(_))
        ));
    }
}
