//! Filesystem backend: applies standard content to a local checkout.
//!
//! ## Write protocol
//!
//! 1. Resolve the repo-relative path under the root (reject escapes).
//! 2. Compare with the bytes on disk → skip if identical.
//! 3. Create parent directories.
//! 4. Write to `<path>.stdcontent.tmp`.
//! 5. Rename to the final path (atomic on POSIX). The temp file never
//!    outlives a failed or cancelled write.
//!
//! Reads and writes go through the bounded executor.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use stdcontent_core::types::is_safe_relative_path;
use stdcontent_core::{ChangeSet, FileSnapshot, RemovalSet, RepoName};

use crate::backend::ContentBackend;
use crate::error::{io_err, SyncError};
use crate::executor::ParallelQueue;

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped; bytes on disk already match.
    Unchanged { path: PathBuf },
}

// ---------------------------------------------------------------------------
// LocalBackend
// ---------------------------------------------------------------------------

/// A checkout on disk, addressed by repo-relative paths.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    queue: ParallelQueue,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            queue: ParallelQueue::default(),
        }
    }

    pub fn with_queue(mut self, queue: ParallelQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SyncError> {
        if !is_safe_relative_path(path) {
            return Err(SyncError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(path.split('/').fold(self.root.clone(), |acc, seg| acc.join(seg)))
    }
}

#[async_trait]
impl ContentBackend for LocalBackend {
    async fn fetch_files(
        &self,
        repo: &RepoName,
        paths: &BTreeSet<String>,
    ) -> Result<FileSnapshot, SyncError> {
        let targets = paths
            .iter()
            .map(|path| Ok((path.clone(), self.resolve(path)?)))
            .collect::<Result<Vec<_>, SyncError>>()?;

        let fetched = self
            .queue
            .run(targets, |(path, full), _| async move {
                match tokio::fs::read(&full).await {
                    Ok(bytes) => Ok((path, Some(bytes))),
                    Err(err) if err.kind() == ErrorKind::NotFound => Ok((path, None)),
                    Err(err) => Err(io_err(&full, err)),
                }
            })
            .await?;

        tracing::debug!(
            repository = %repo,
            root = %self.root.display(),
            requested = paths.len(),
            present = fetched.iter().filter(|(_, bytes)| bytes.is_some()).count(),
            "fetched local files",
        );
        Ok(fetched.into_iter().collect())
    }

    async fn apply_files(
        &self,
        repo: &RepoName,
        files: &ChangeSet,
        removals: &RemovalSet,
    ) -> Result<(), SyncError> {
        let writes = files
            .iter()
            .map(|(path, bytes)| Ok((self.resolve(path)?, bytes.clone())))
            .collect::<Result<Vec<_>, SyncError>>()?;
        let deletes = removals
            .iter()
            .map(|path| self.resolve(path))
            .collect::<Result<Vec<_>, SyncError>>()?;

        let results = self
            .queue
            .run(writes, |(full, bytes), _| async move {
                atomic_write(&full, &bytes).await
            })
            .await?;

        let written = results
            .iter()
            .filter(|r| matches!(r, WriteResult::Written { .. }))
            .count();

        self.queue
            .for_each(deletes, |full, _| async move { remove_if_present(&full).await })
            .await?;

        tracing::info!(
            repository = %repo,
            root = %self.root.display(),
            written,
            unchanged = results.len() - written,
            removed = removals.len(),
            "applied files to local checkout",
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Atomically write `content` to `path` unless the file already holds it.
async fn atomic_write(path: &Path, content: &[u8]) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.stdcontent.tmp", path.display()));
    atomic_write_with_tmp(path, content, &tmp).await
}

async fn atomic_write_with_tmp(
    path: &Path,
    content: &[u8],
    tmp: &Path,
) -> Result<WriteResult, SyncError> {
    match tokio::fs::read(path).await {
        Ok(existing) if existing == content => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err(parent, e))?;
    }

    // Runs to completion on the blocking pool even if this future is dropped.
    let (dest, staged, bytes) = (path.to_path_buf(), tmp.to_path_buf(), content.to_vec());
    tokio::task::spawn_blocking(move || write_then_rename(&dest, &bytes, &staged))
        .await
        .map_err(|e| SyncError::Backend(Box::new(e)))??;

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

fn write_then_rename(path: &Path, content: &[u8], tmp: &Path) -> Result<(), SyncError> {
    let guard = TmpFile::new(tmp);
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;
    std::fs::rename(tmp, path).map_err(|e| io_err(path, e))?;
    guard.disarm();
    Ok(())
}

/// Removes the temp file on drop unless the rename went through.
struct TmpFile<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> TmpFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TmpFile<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(self.path);
        }
    }
}

async fn remove_if_present(path: &Path) -> Result<(), SyncError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::info!("removed: {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn repo() -> RepoName {
        RepoName::from("LordMike/example")
    }

    fn paths(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn fetch_reports_missing_files_as_none() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("LICENSE"), "MIT").unwrap();
        let backend = LocalBackend::new(tmp.path());

        let snapshot = backend
            .fetch_files(&repo(), &paths(&["LICENSE", "_Local/.gitignore"]))
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["LICENSE"], Some(b"MIT".to_vec()));
        assert_eq!(snapshot["_Local/.gitignore"], None);
    }

    #[tokio::test]
    async fn fetch_rejects_escaping_paths() {
        let tmp = TempDir::new().unwrap();
        let backend = LocalBackend::new(tmp.path());
        let err = backend
            .fetch_files(&repo(), &paths(&["../secret"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn apply_writes_nested_files_and_removes() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("old.txt"), "bye").unwrap();
        let backend = LocalBackend::new(tmp.path());

        let mut files = ChangeSet::new();
        files.insert(".github/workflows/ci.yml".into(), b"on: push\n".to_vec());
        files.insert("LICENSE".into(), b"MIT".to_vec());
        let removals = paths(&["old.txt", "never-existed.txt"]);

        backend.apply_files(&repo(), &files, &removals).await.unwrap();

        assert_eq!(
            fs::read(tmp.path().join(".github/workflows/ci.yml")).unwrap(),
            b"on: push\n"
        );
        assert_eq!(fs::read(tmp.path().join("LICENSE")).unwrap(), b"MIT");
        assert!(!tmp.path().join("old.txt").exists());
    }

    #[tokio::test]
    async fn serial_queue_applies_everything() {
        let tmp = TempDir::new().unwrap();
        let backend = LocalBackend::new(tmp.path()).with_queue(ParallelQueue {
            max_in_flight: 1,
            queue_depth: 1,
        });

        let files: ChangeSet = (0..10)
            .map(|n| (format!("dir/{n}.txt"), n.to_string().into_bytes()))
            .collect();
        backend
            .apply_files(&repo(), &files, &RemovalSet::new())
            .await
            .unwrap();

        let snapshot = backend
            .fetch_files(&repo(), &files.keys().cloned().collect())
            .await
            .unwrap();
        assert!(snapshot.values().all(Option::is_some));
        assert_eq!(snapshot["dir/7.txt"], Some(b"7".to_vec()));
    }

    #[tokio::test]
    async fn identical_content_is_not_rewritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("same.txt");
        let first = atomic_write(&path, b"content").await.unwrap();
        let second = atomic_write(&path, b"content").await.unwrap();
        assert!(matches!(first, WriteResult::Written { .. }));
        assert!(matches!(second, WriteResult::Unchanged { .. }));
    }

    #[tokio::test]
    async fn changed_content_is_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.md");
        atomic_write(&path, b"v1").await.unwrap();
        let result = atomic_write(&path, b"v2").await.unwrap();
        assert!(matches!(result, WriteResult::Written { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"v2");
    }

    #[tokio::test]
    async fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.md");
        atomic_write(&path, b"data").await.unwrap();
        let tmp_path = PathBuf::from(format!("{}.stdcontent.tmp", path.display()));
        assert!(!tmp_path.exists(), ".stdcontent.tmp must be cleaned up");
    }

    #[tokio::test]
    async fn failed_write_leaves_no_tmp_behind() {
        let tmp = TempDir::new().unwrap();
        // A directory at the destination cannot be replaced by a file.
        let path = tmp.path().join("occupied");
        fs::create_dir_all(path.join("child")).unwrap();
        let tmp_path = tmp.path().join("occupied.tmp");

        let err = atomic_write_with_tmp(&path, b"data", &tmp_path).await;
        assert!(err.is_err());
        assert!(!tmp_path.exists());
    }

    #[test]
    fn armed_tmp_file_is_removed_on_drop() {
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("LICENSE.stdcontent.tmp");
        fs::write(&staged, "partial").unwrap();

        drop(TmpFile::new(&staged));
        assert!(!staged.exists());
    }

    #[test]
    fn disarmed_tmp_file_is_left_alone() {
        let tmp = TempDir::new().unwrap();
        let staged = tmp.path().join("LICENSE.stdcontent.tmp");
        fs::write(&staged, "kept").unwrap();

        TmpFile::new(&staged).disarm();
        assert_eq!(fs::read(&staged).unwrap(), b"kept");
    }

    #[test]
    fn failed_rename_removes_the_written_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("occupied");
        fs::create_dir_all(path.join("child")).unwrap();
        let staged = tmp.path().join("occupied.stdcontent.tmp");

        let err = write_then_rename(&path, b"data", &staged).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
        assert!(!staged.exists());
        assert!(path.join("child").is_dir());
    }
}
