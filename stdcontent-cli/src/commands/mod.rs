pub mod apply;
pub mod diff;
pub mod list;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stdcontent_core::{ReferenceUpdate, RemovalMode, RepositoryConfig};
use stdcontent_sync::{SyncError, SyncOptions};

use crate::RemovalModeArg;

/// Arguments shared by commands that target a local checkout.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Path to `repos.json`.
    pub config: PathBuf,

    /// Local checkout to reconcile.
    #[arg(long, value_name = "DIR")]
    pub local: PathBuf,

    /// Repository name; defaults to the one matching the checkout's directory name.
    #[arg(long, value_name = "NAME")]
    pub repo: Option<String>,

    /// What to do with files that are no longer managed: keep | remove.
    #[arg(long, value_name = "MODE")]
    pub removal: Option<RemovalModeArg>,
}

impl TargetArgs {
    pub fn load_config(&self) -> Result<RepositoryConfig> {
        let config = RepositoryConfig::load(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;
        tracing::debug!(
            config = %self.config.display(),
            repositories = config.repositories().len(),
            "loaded config",
        );
        Ok(config)
    }

    pub fn options(&self, reference: ReferenceUpdate, dry_run: bool) -> SyncOptions {
        SyncOptions {
            removal: self.removal.map(RemovalMode::from).unwrap_or_default(),
            reference,
            dry_run,
        }
    }
}

/// Attach the flag that resolves a missing removal decision.
pub fn explain(err: SyncError) -> anyhow::Error {
    let hint = matches!(err, SyncError::RemovalModeRequired { .. });
    let err = anyhow::Error::new(err);
    if hint {
        err.context("rerun with `--removal keep` or `--removal remove`")
    } else {
        err
    }
}
