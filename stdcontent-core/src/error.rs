//! Error types for stdcontent-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading `repos.json` and building desired content.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error on load, with the config path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No repository in the config matches the requested name.
    #[error("repository '{name}' not found in config")]
    UnknownRepository { name: String },

    /// A short name matched more than one configured repository.
    #[error("'{name}' matches multiple repositories: {}", .matches.join(", "))]
    AmbiguousRepository { name: String, matches: Vec<String> },

    /// Two enabled profiles both provide the same target path.
    #[error("target path '{path}' is provided by both '{first}' and '{second}'")]
    DuplicatePath {
        path: String,
        first: String,
        second: String,
    },

    /// A target path is absolute, uses `\`, or escapes the repository root.
    #[error("profile '{profile}' has invalid target path '{path}'")]
    InvalidTargetPath { profile: String, path: String },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

/// Errors reading or writing the `.standard_content.json` manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The stored manifest is not valid JSON.
    #[error("manifest is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The stored manifest parsed, but its root is not a JSON object.
    #[error("manifest root must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// Serializing the rebuilt manifest failed.
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),
}
