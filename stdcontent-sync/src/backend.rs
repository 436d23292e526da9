//! The backend contract the reconciliation engine drives.
//!
//! A backend is any content store that can report the current bytes of a set
//! of paths and apply a full file set plus deletions as one logical unit: a
//! local checkout, or a single commit against a hosted repository.

use std::collections::BTreeSet;

use async_trait::async_trait;

use stdcontent_core::{ChangeSet, FileSnapshot, RemovalSet, RepoName};

use crate::error::SyncError;

#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Current content for every requested path.
    ///
    /// The returned snapshot has an entry for each path; a file that does not
    /// exist maps to `None` and is never an error.
    async fn fetch_files(
        &self,
        repo: &RepoName,
        paths: &BTreeSet<String>,
    ) -> Result<FileSnapshot, SyncError>;

    /// Write `files` and delete `removals` as one unit.
    async fn apply_files(
        &self,
        repo: &RepoName,
        files: &ChangeSet,
        removals: &RemovalSet,
    ) -> Result<(), SyncError>;
}
