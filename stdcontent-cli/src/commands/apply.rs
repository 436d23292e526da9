//! `stdcontent apply`: reconcile standard content into a local checkout.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stdcontent_core::ReferenceUpdate;
use stdcontent_sync::{pipeline, ReconcileOutcome, RepoReport};

use super::{explain, TargetArgs};

/// Arguments for `stdcontent apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Value for `meta.reference` in the manifest; an empty string removes it.
    #[arg(long, value_name = "TEXT")]
    pub meta_reference: Option<String>,

    /// Show what would be written without actually writing any files.
    #[arg(long)]
    pub dry_run: bool,
}

impl ApplyArgs {
    pub async fn run(self) -> Result<()> {
        let config = self.target.load_config()?;
        let options = self.target.options(
            ReferenceUpdate::from(self.meta_reference.clone()),
            self.dry_run,
        );

        let report = pipeline::run_local(
            &config,
            &self.target.local,
            self.target.repo.as_deref(),
            &options,
        )
        .await
        .map_err(explain)
        .with_context(|| format!("apply failed for {}", self.target.local.display()))?;

        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &RepoReport) {
    let name = &report.repository;
    match &report.outcome {
        None => println!("· '{name}' selects no files, skipped"),
        Some(ReconcileOutcome::UpToDate) => {
            println!("{} '{name}' is up to date", "✓".green());
        }
        Some(ReconcileOutcome::Applied { changed, removed }) => {
            println!(
                "{} '{name}' updated ({} written, {} removed)",
                "✓".green(),
                changed.len(),
                removed.len()
            );
            for path in changed {
                println!("  ✎  {path}");
            }
            for path in removed {
                println!("  {}  {path}", "✗".red());
            }
        }
        Some(ReconcileOutcome::WouldApply { changed, removed }) => {
            println!(
                "[dry-run] '{name}' would update ({} to write, {} to remove)",
                changed.len(),
                removed.len()
            );
            for path in changed {
                println!("[dry-run]   ~  {path}");
            }
            for path in removed {
                println!("[dry-run]   ✗  {path}");
            }
        }
    }
}
