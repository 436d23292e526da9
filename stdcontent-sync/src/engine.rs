//! Reconciliation engine.
//!
//! ## Cycle
//!
//! 1. Fetch every desired path, the manifest, and applicable `_Local/` overrides.
//! 2. Merge overrides into a working copy of the desired files.
//! 3. Normalize and diff each desired file against what the backend holds.
//! 4. Parse the stored manifest; refuse to continue if managed files fell out
//!    of the set and no removal mode was chosen. Orphans about to be removed
//!    are fetched as well.
//! 5. Rebuild the manifest without touching `last_updated`; only when that
//!    differs (or any file changed) rebuild it again with a fresh timestamp.
//! 6. Nothing changed and nothing to remove → done, no write. Otherwise hand
//!    the **whole** working file map and the removals to the backend once.
//!
//! Nothing is written before step 6, so a failure anywhere earlier leaves the
//! target untouched.

use std::collections::BTreeSet;

use stdcontent_core::manifest::{self, Manifest, MANIFEST_PATH};
use stdcontent_core::{
    normalize, normalize_in_place, ChangeSet, DesiredContent, FileSnapshot, OverrideTable,
    RemovalMode, RemovalSet, RepoName,
};

use crate::backend::ContentBackend;
use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Plan / outcome
// ---------------------------------------------------------------------------

/// Everything the engine decided for one repository, before any write.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub repo: RepoName,
    /// The full file map to apply, manifest included.
    pub files: ChangeSet,
    /// What the backend held for every fetched path.
    pub current: FileSnapshot,
    /// Paths whose content differs from the backend (manifest included when outdated).
    pub changed: BTreeSet<String>,
    /// Paths to delete.
    pub removals: RemovalSet,
    /// Managed files that dropped out of the set but are left in place.
    pub kept: BTreeSet<String>,
    /// The manifest as it will be written.
    pub manifest: Manifest,
}

impl ReconcilePlan {
    pub fn is_up_to_date(&self) -> bool {
        self.changed.is_empty() && self.removals.is_empty()
    }
}

/// Result of [`Reconciler::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Target already matches; the backend was not written to.
    UpToDate,
    /// The backend applied the file set.
    Applied {
        changed: Vec<String>,
        removed: Vec<String>,
    },
    /// Dry run: what would have been applied.
    WouldApply {
        changed: Vec<String>,
        removed: Vec<String>,
    },
}

impl ReconcileOutcome {
    /// `true` only when the backend was actually written to.
    pub fn applied(&self) -> bool {
        matches!(self, ReconcileOutcome::Applied { .. })
    }

    fn from_plan(plan: &ReconcilePlan, dry_run: bool) -> Self {
        let changed = plan.changed.iter().cloned().collect();
        let removed = plan.removals.iter().cloned().collect();
        if dry_run {
            ReconcileOutcome::WouldApply { changed, removed }
        } else {
            ReconcileOutcome::Applied { changed, removed }
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Drives one backend through the reconciliation cycle.
#[derive(Debug, Clone)]
pub struct Reconciler<B> {
    backend: B,
    overrides: OverrideTable,
    dry_run: bool,
}

impl<B: ContentBackend> Reconciler<B> {
    /// Engine over `backend` with the standard override table.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            overrides: OverrideTable::standard(),
            dry_run: false,
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    /// Plan as usual but never call [`ContentBackend::apply_files`].
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch, merge, diff and build the manifest. Nothing is written.
    ///
    /// Fails with [`SyncError::RemovalModeRequired`] when previously managed
    /// files are no longer desired and `removal` is [`RemovalMode::Unset`].
    pub async fn plan(
        &self,
        desired: &DesiredContent,
        removal: RemovalMode,
    ) -> Result<ReconcilePlan, SyncError> {
        let repo = &desired.meta.repo;

        // Working copy; the caller's desired content is never touched.
        let mut files = desired.files.clone();
        if files.remove(MANIFEST_PATH).is_some() {
            tracing::warn!(
                repository = %repo,
                "desired content contained {MANIFEST_PATH}; it is generated and was ignored",
            );
        }

        let mut fetch: BTreeSet<String> = files.keys().cloned().collect();
        fetch.insert(MANIFEST_PATH.to_owned());
        fetch.extend(self.overrides.override_paths_for(&files).map(str::to_owned));

        let mut current = self.backend.fetch_files(repo, &fetch).await?;

        self.overrides.merge(&mut files, &current);

        let mut changed = BTreeSet::new();
        for (path, bytes) in files.iter_mut() {
            normalize_in_place(bytes);
            let differs = match current.get(path) {
                Some(Some(existing)) => normalize(existing) != *bytes,
                _ => true,
            };
            if differs {
                changed.insert(path.clone());
            }
        }

        let existing = match current.get(MANIFEST_PATH) {
            Some(Some(bytes)) => Manifest::parse(bytes).map_err(|source| SyncError::Manifest {
                repo: repo.clone(),
                source,
            })?,
            _ => None,
        };

        let orphaned =
            manifest::detect_removed_managed(existing.as_ref(), &desired.meta.managed_files);
        let (removals, kept) = match removal {
            _ if orphaned.is_empty() => (RemovalSet::new(), BTreeSet::new()),
            RemovalMode::Unset => {
                return Err(SyncError::RemovalModeRequired {
                    repo: repo.clone(),
                    paths: orphaned.into_iter().collect(),
                });
            }
            RemovalMode::Keep => (RemovalSet::new(), orphaned),
            RemovalMode::Remove => (orphaned, BTreeSet::new()),
        };

        // Orphans are only known once the manifest is read; fetch them so the
        // plan holds what is about to be deleted.
        if !removals.is_empty() {
            let removed = self.backend.fetch_files(repo, &removals).await?;
            current.extend(removed);
        }

        let mut built = manifest::build(existing.as_ref(), &desired.meta, false);
        let meta_outdated = !changed.is_empty() || existing.as_ref() != Some(&built);
        if meta_outdated {
            built = manifest::build(existing.as_ref(), &desired.meta, true);
            changed.insert(MANIFEST_PATH.to_owned());
        }

        let mut manifest_bytes = built.to_bytes().map_err(|source| SyncError::Manifest {
            repo: repo.clone(),
            source,
        })?;
        normalize_in_place(&mut manifest_bytes);
        files.insert(MANIFEST_PATH.to_owned(), manifest_bytes);

        Ok(ReconcilePlan {
            repo: repo.clone(),
            files,
            current,
            changed,
            removals,
            kept,
            manifest: built,
        })
    }

    /// Reconcile `desired` into the backend.
    ///
    /// Performs at most one [`ContentBackend::apply_files`] call, carrying the
    /// entire file map, and none at all when the target is already up to date.
    pub async fn apply(
        &self,
        desired: &DesiredContent,
        removal: RemovalMode,
    ) -> Result<ReconcileOutcome, SyncError> {
        let plan = self.plan(desired, removal).await?;
        let repo = &plan.repo;

        for path in &plan.kept {
            tracing::info!(repository = %repo, path = %path, "no longer managed, keeping file");
        }

        if plan.is_up_to_date() {
            tracing::info!(repository = %repo, "is up-to-date");
            return Ok(ReconcileOutcome::UpToDate);
        }

        for path in &plan.changed {
            tracing::info!(repository = %repo, path = %path, "is outdated");
        }
        for path in &plan.removals {
            tracing::info!(repository = %repo, path = %path, "no longer managed, removing file");
        }

        if self.dry_run {
            tracing::info!(
                repository = %repo,
                files = plan.files.len(),
                removals = plan.removals.len(),
                "[dry-run] skipping apply",
            );
            return Ok(ReconcileOutcome::from_plan(&plan, true));
        }

        self.backend
            .apply_files(repo, &plan.files, &plan.removals)
            .await?;
        Ok(ReconcileOutcome::from_plan(&plan, false))
    }
}
