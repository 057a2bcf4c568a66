//! Startup sweep of the cache directory.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use feedbuf_core::{CacheEntry, FeedResult, VideoId};

use super::paths::{CacheFileKind, classify};

/// What a sweep did to the cache directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Files deleted.
    pub removed: Vec<PathBuf>,
    /// Completed files kept and handed back for indexing.
    pub adopted: Vec<CacheEntry>,
    /// Partial downloads kept for resumption.
    pub kept_partial: usize,
}

/// Delete a cache file, treating a missing file as already gone.
///
/// Returns whether a file was removed. Failures are logged, not returned.
pub(crate) async fn remove_cache_file(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove cache file");
            false
        }
    }
}

/// Sweep `dir`, keeping only files owned by `keep` that are younger than `max_age`.
///
/// Files the cache does not own are left alone. A missing directory sweeps
/// to an empty report.
pub async fn sweep_directory(
    dir: &Path,
    keep: &HashSet<VideoId>,
    max_age: Duration,
) -> FeedResult<SweepReport> {
    let owners: HashMap<String, &VideoId> = keep.iter().map(|id| (id.file_stem(), id)).collect();
    let mut report = SweepReport::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some((stem, kind)) = file_name.to_str().and_then(classify) else {
            continue;
        };
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "Skipping unreadable cache file");
                continue;
            }
        };

        let modified = metadata.modified().ok();
        let expired = modified
            .and_then(|at| at.elapsed().ok())
            .is_some_and(|age| age > max_age);
        let path = entry.path();

        match (owners.get(stem), kind) {
            (Some(id), CacheFileKind::Complete) if !expired => {
                let mut adopted = CacheEntry::new((*id).clone(), path, metadata.len());
                if let Some(at) = modified {
                    adopted = adopted.with_last_accessed(DateTime::<Utc>::from(at));
                }
                report.adopted.push(adopted);
            }
            (Some(_), CacheFileKind::Partial) if !expired => report.kept_partial += 1,
            _ => {
                if remove_cache_file(&path).await {
                    tracing::debug!(path = %path.display(), expired, "Swept cache file");
                    report.removed.push(path);
                }
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, bytes: usize) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; bytes]).unwrap();
        path
    }

    fn age(path: &Path, by: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    fn keep(ids: &[&str]) -> HashSet<VideoId> {
        ids.iter().map(|id| VideoId::new(*id)).collect()
    }

    #[tokio::test]
    async fn test_sweep_deletes_unowned_and_adopts_active() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "v1.mp4", 10);
        write(dir.path(), "v2.mp4", 20);
        write(dir.path(), "v3.mp4.part", 5);
        write(dir.path(), "readme.txt", 1);

        let report = sweep_directory(dir.path(), &keep(&["v1"]), Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(report.adopted.len(), 1);
        assert_eq!(report.adopted[0].video_id, VideoId::new("v1"));
        assert_eq!(report.adopted[0].size_bytes, 10);
        assert_eq!(report.removed.len(), 2);
        assert!(dir.path().join("v1.mp4").exists());
        assert!(!dir.path().join("v2.mp4").exists());
        assert!(!dir.path().join("v3.mp4.part").exists());
        assert!(dir.path().join("readme.txt").exists());
    }

    #[tokio::test]
    async fn test_sweep_matches_files_by_escaped_stem() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a%2Eb.mp4", 10);
        write(dir.path(), "a_b.mp4", 20);

        let report = sweep_directory(dir.path(), &keep(&["a.b"]), Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(report.adopted.len(), 1);
        assert_eq!(report.adopted[0].video_id, VideoId::new("a.b"));
        assert_eq!(report.adopted[0].size_bytes, 10);
        assert_eq!(report.removed, vec![dir.path().join("a_b.mp4")]);
        assert!(dir.path().join("a%2Eb.mp4").exists());
    }

    #[tokio::test]
    async fn test_sweep_deletes_expired_active_files() {
        let dir = TempDir::new().unwrap();
        let old = write(dir.path(), "v1.mp4", 10);
        age(&old, Duration::from_secs(48 * 3600));

        let report = sweep_directory(dir.path(), &keep(&["v1"]), Duration::from_secs(24 * 3600))
            .await
            .unwrap();

        assert!(report.adopted.is_empty());
        assert_eq!(report.removed, vec![old.clone()]);
        assert!(!old.exists());
    }

    #[tokio::test]
    async fn test_sweep_keeps_partial_of_active() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "v1.mp4.part", 7);

        let report = sweep_directory(dir.path(), &keep(&["v1"]), Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(report.kept_partial, 1);
        assert!(dir.path().join("v1.mp4.part").exists());
    }

    #[tokio::test]
    async fn test_sweep_of_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let report = sweep_directory(&dir.path().join("absent"), &keep(&[]), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(report, SweepReport::default());
    }
}
