//! stdcontent: keep standard files in sync across repositories.
//!
//! # Usage
//!
//! ```text
//! stdcontent apply <repos.json> --local <dir> [--repo <name>] [--removal keep|remove] [--meta-reference <text>] [--dry-run]
//! stdcontent diff <repos.json> --local <dir> [--repo <name>] [--removal keep|remove]
//! stdcontent list <repos.json> [--repo <name>]
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change verbosity.

mod commands;

use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{apply::ApplyArgs, diff::DiffArgs, list::ListArgs};
use stdcontent_core::RemovalMode;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stdcontent",
    version,
    about = "Reconcile standard content (licenses, lint configs, CI files) into repositories",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the configured standard content into a local checkout.
    Apply(ApplyArgs),

    /// Show unified diffs of what apply would write.
    Diff(DiffArgs),

    /// List configured repositories and their profiles.
    List(ListArgs),
}

// ---------------------------------------------------------------------------
// Shared RemovalMode argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `RemovalMode` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemovalModeArg(pub RemovalMode);

impl FromStr for RemovalModeArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep" => Ok(Self(RemovalMode::Keep)),
            "remove" => Ok(Self(RemovalMode::Remove)),
            other => Err(format!(
                "unknown removal mode '{other}'; expected: keep, remove"
            )),
        }
    }
}

impl From<RemovalModeArg> for RemovalMode {
    fn from(arg: RemovalModeArg) -> Self {
        arg.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Apply(args) => args.run().await,
        Commands::Diff(args) => args.run().await,
        Commands::List(args) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
