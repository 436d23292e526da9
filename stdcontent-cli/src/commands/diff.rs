//! `stdcontent diff`: show unified diffs for what apply would write.

use anyhow::{Context, Result};
use clap::Args;

use stdcontent_core::ReferenceUpdate;
use stdcontent_sync::{pipeline, render_diff};

use super::{explain, TargetArgs};

/// Arguments for `stdcontent diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

impl DiffArgs {
    pub async fn run(self) -> Result<()> {
        let config = self.target.load_config()?;
        let options = self.target.options(ReferenceUpdate::Keep, true);

        let (repo, plan) = pipeline::plan_local(
            &config,
            &self.target.local,
            self.target.repo.as_deref(),
            &options,
        )
        .await
        .map_err(explain)
        .with_context(|| format!("diff failed for {}", self.target.local.display()))?;

        let Some(plan) = plan else {
            println!("'{repo}' selects no files.");
            return Ok(());
        };

        let diffs = render_diff(&plan);
        if diffs.is_empty() {
            println!("No differences for '{repo}'.");
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }
        for path in &plan.removals {
            println!("remove: {path}");
        }
        for path in &plan.kept {
            println!("keep (unmanaged): {path}");
        }

        Ok(())
    }
}
