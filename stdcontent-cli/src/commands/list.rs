//! `stdcontent list`: configured repositories and their profiles.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stdcontent_core::RepositoryConfig;

/// Arguments for `stdcontent list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Path to `repos.json`.
    pub config: PathBuf,

    /// Only show this repository, by full or short name.
    #[arg(long, value_name = "NAME")]
    pub repo: Option<String>,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let config = RepositoryConfig::load(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;

        if config.repositories().is_empty() {
            println!("No repositories configured.");
            return Ok(());
        }

        let profiles: Vec<&str> = config.profile_names().collect();
        println!("Profiles: {}\n", profiles.join(", "));

        let selected = config
            .select(self.repo.as_deref())
            .context("cannot list repository")?;
        for repo in selected {
            println!("{}", repo.name.to_string().bold());
            let profiles = config.profiles_for(repo);
            if profiles.is_empty() {
                println!("  (no profiles)");
            }
            for profile in profiles {
                println!("  - {profile}");
            }
        }

        Ok(())
    }
}
