//! Shared pipeline entrypoints used by the CLI.

use std::path::Path;

use stdcontent_core::{
    ReferenceUpdate, RemovalMode, RepoName, RepositoryConfig, RepositoryEntry,
};

use crate::backend::ContentBackend;
use crate::engine::{ReconcileOutcome, ReconcilePlan, Reconciler};
use crate::local::LocalBackend;
use crate::SyncError;

/// Per-run operator choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub removal: RemovalMode,
    pub reference: ReferenceUpdate,
    pub dry_run: bool,
}

/// What happened to one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReport {
    pub repository: RepoName,
    /// `None` when the repository selects no files and was skipped.
    pub outcome: Option<ReconcileOutcome>,
}

/// Reconcile the repository checked out at `local`.
///
/// `name` overrides the repository inferred from the directory name.
pub async fn run_local(
    config: &RepositoryConfig,
    local: &Path,
    name: Option<&str>,
    options: &SyncOptions,
) -> Result<RepoReport, SyncError> {
    let repo = config.resolve_local(name, local)?;
    let engine = Reconciler::new(LocalBackend::new(local)).dry_run(options.dry_run);
    tracing::debug!(
        repository = %repo.name,
        root = %engine.backend().root().display(),
        "resolved local checkout",
    );
    reconcile_one(config, repo, &engine, options).await
}

/// Plan the repository checked out at `local` without writing anything.
///
/// Returns the resolved repository and `None` in place of a plan when the
/// repository selects no files.
pub async fn plan_local(
    config: &RepositoryConfig,
    local: &Path,
    name: Option<&str>,
    options: &SyncOptions,
) -> Result<(RepoName, Option<ReconcilePlan>), SyncError> {
    let repo = config.resolve_local(name, local)?;
    let desired = config.desired_content(repo, options.reference.clone())?;
    if desired.files.is_empty() {
        tracing::info!(repository = %repo.name, "no files selected, skipping");
        return Ok((repo.name.clone(), None));
    }

    let engine = Reconciler::new(LocalBackend::new(local));
    let plan = engine.plan(&desired, options.removal).await?;
    Ok((repo.name.clone(), Some(plan)))
}

async fn reconcile_one<B: ContentBackend>(
    config: &RepositoryConfig,
    repo: &RepositoryEntry,
    engine: &Reconciler<B>,
    options: &SyncOptions,
) -> Result<RepoReport, SyncError> {
    let desired = config.desired_content(repo, options.reference.clone())?;
    if desired.files.is_empty() {
        tracing::info!(repository = %repo.name, "no files selected, skipping");
        return Ok(RepoReport {
            repository: repo.name.clone(),
            outcome: None,
        });
    }

    tracing::info!(
        repository = %repo.name,
        profiles = ?desired.meta.profiles,
        files = desired.files.len(),
        "reconciling",
    );
    let outcome = engine.apply(&desired, options.removal).await?;
    Ok(RepoReport {
        repository: repo.name.clone(),
        outcome: Some(outcome),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use stdcontent_core::MANIFEST_PATH;

    use super::*;

    /// `repos.json` plus sources in one dir, and a checkout named `example`.
    fn fixture() -> (TempDir, RepositoryConfig, std::path::PathBuf) {
        let tmp = TempDir::new().expect("tmp");
        let files = tmp.path().join("files");
        fs::create_dir_all(&files).expect("mkdir");
        fs::write(files.join("LICENSE"), "MIT\r\n").expect("write");
        fs::write(files.join("gitignore"), "bin/\n").expect("write");

        let json = r#"{
            "content": {
                "base": { "LICENSE": "files/LICENSE" },
                "dotnet": { ".gitignore": "files/gitignore" }
            },
            "repositories": {
                "LordMike/example": { "base": true, "dotnet": true },
                "LordMike/empty": { "base": false }
            }
        }"#;
        let config_path = tmp.path().join("repos.json");
        fs::write(&config_path, json).expect("write config");
        let config = RepositoryConfig::load(&config_path).expect("load");

        let checkout = tmp.path().join("example");
        fs::create_dir_all(&checkout).expect("mkdir checkout");
        (tmp, config, checkout)
    }

    #[tokio::test]
    async fn run_local_writes_then_reports_up_to_date() {
        let (_tmp, config, checkout) = fixture();
        let options = SyncOptions::default();

        let first = run_local(&config, &checkout, None, &options)
            .await
            .expect("first run");
        assert_eq!(first.repository.as_str(), "LordMike/example");
        assert!(first.outcome.as_ref().is_some_and(ReconcileOutcome::applied));
        assert_eq!(fs::read(checkout.join("LICENSE")).expect("read"), b"MIT\n");
        assert!(checkout.join(MANIFEST_PATH).exists());

        let second = run_local(&config, &checkout, None, &options)
            .await
            .expect("second run");
        assert_eq!(second.outcome, Some(ReconcileOutcome::UpToDate));
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let (_tmp, config, checkout) = fixture();
        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };

        let report = run_local(&config, &checkout, None, &options)
            .await
            .expect("run");
        assert!(matches!(
            report.outcome,
            Some(ReconcileOutcome::WouldApply { .. })
        ));
        assert!(!checkout.join("LICENSE").exists());
        assert!(!checkout.join(MANIFEST_PATH).exists());
    }

    #[tokio::test]
    async fn repository_without_files_is_skipped() {
        let (tmp, config, _checkout) = fixture();
        let empty = tmp.path().join("empty");
        fs::create_dir_all(&empty).expect("mkdir");

        let report = run_local(&config, &empty, None, &SyncOptions::default())
            .await
            .expect("run");
        assert_eq!(report.repository.as_str(), "LordMike/empty");
        assert_eq!(report.outcome, None);
        assert!(!empty.join(MANIFEST_PATH).exists());
    }

    #[tokio::test]
    async fn explicit_name_overrides_directory_name() {
        let (tmp, config, _checkout) = fixture();
        let elsewhere = tmp.path().join("some-other-dir");
        fs::create_dir_all(&elsewhere).expect("mkdir");

        let report = run_local(&config, &elsewhere, Some("example"), &SyncOptions::default())
            .await
            .expect("run");
        assert_eq!(report.repository.as_str(), "LordMike/example");
        assert!(elsewhere.join("LICENSE").exists());
    }

    #[tokio::test]
    async fn unknown_directory_is_a_config_error() {
        let (tmp, config, _checkout) = fixture();
        let stray = tmp.path().join("stray");
        fs::create_dir_all(&stray).expect("mkdir");

        let err = run_local(&config, &stray, None, &SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[tokio::test]
    async fn plan_local_reports_changes_without_writing() {
        let (_tmp, config, checkout) = fixture();
        let (repo, plan) = plan_local(&config, &checkout, None, &SyncOptions::default())
            .await
            .expect("plan");
        let plan = plan.expect("files selected");

        assert_eq!(repo.as_str(), "LordMike/example");
        assert!(plan.changed.contains("LICENSE"));
        assert!(plan.changed.contains(".gitignore"));
        assert!(plan.changed.contains(MANIFEST_PATH));
        assert!(!checkout.join("LICENSE").exists());
    }
}
