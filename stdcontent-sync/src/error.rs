//! Error types for stdcontent-sync.

use std::path::PathBuf;

use thiserror::Error;

use stdcontent_core::{ConfigError, ManifestError, RepoName};

/// All errors that can arise from reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Previously managed files fell out of the desired set and no removal
    /// decision was supplied. Raised before anything is written.
    #[error(
        "{repo}: {} previously managed file(s) are no longer desired ({}); choose a removal mode (keep or remove)",
        .paths.len(),
        .paths.join(", ")
    )]
    RemovalModeRequired { repo: RepoName, paths: Vec<String> },

    /// The stored manifest could not be read, or the new one written.
    #[error("{repo}: manifest error: {source}")]
    Manifest {
        repo: RepoName,
        #[source]
        source: ManifestError,
    },

    /// An error from configuration loading.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A repo-relative path that is absolute or escapes the target root.
    #[error("refusing to touch path outside the target: '{path}'")]
    InvalidPath { path: String },

    /// Any other failure reported by a backend adapter.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
