//! Standard content core library: domain types, normalization, manifest, config.
//!
//! Public API surface:
//! - [`types`]: newtypes, desired content and the change/removal sets
//! - [`normalize`]: CRLF → LF byte normalization
//! - [`overrides`]: `_Local/` override merging
//! - [`manifest`]: `.standard_content.json` building and drift helpers
//! - [`config`]: `repos.json` loading and desired-content construction
//! - [`error`]: [`ConfigError`], [`ManifestError`]

pub mod config;
pub mod error;
pub mod manifest;
pub mod normalize;
pub mod overrides;
pub mod types;

pub use config::{RepositoryConfig, RepositoryEntry};
pub use error::{ConfigError, ManifestError};
pub use manifest::{Manifest, MANIFEST_PATH, SCHEMA_URL};
pub use normalize::{normalize, normalize_in_place};
pub use overrides::{OverridePair, OverrideTable};
pub use types::{
    ChangeSet, DesiredContent, FileMap, FileSnapshot, ManagedSetDescriptor, ReferenceUpdate,
    RemovalMode, RemovalSet, RepoName,
};
