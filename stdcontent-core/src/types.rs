//! Domain types for standard content reconciliation.
//!
//! Repository-relative paths are plain `String`s with forward-slash separators;
//! they are keys into a remote tree as much as into a directory, so they are
//! never converted to `PathBuf` at this layer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::manifest::MANIFEST_PATH;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Repo-relative path → file bytes, ordered by ordinal path.
pub type FileMap = BTreeMap<String, Vec<u8>>;

/// Final bytes to write, keyed by path. Includes the manifest when it changes.
pub type ChangeSet = FileMap;

/// Paths to delete from the target.
pub type RemovalSet = BTreeSet<String>;

/// Current backend state for a set of paths. `None` means the file is absent.
pub type FileSnapshot = BTreeMap<String, Option<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed repository identifier, e.g. `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoName(pub String);

impl RepoName {
    /// The part after the last `/`, or the whole name when there is none.
    pub fn short_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Operator decision for files that were managed before but are no longer desired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalMode {
    /// No decision supplied. Fatal if any managed file fell out of the set.
    #[default]
    Unset,
    /// Leave orphaned files in place; only drop them from the manifest.
    Keep,
    /// Delete orphaned files from the target.
    Remove,
}

impl fmt::Display for RemovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalMode::Unset => write!(f, "unset"),
            RemovalMode::Keep => write!(f, "keep"),
            RemovalMode::Remove => write!(f, "remove"),
        }
    }
}

/// How `meta.reference` in the manifest should be updated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReferenceUpdate {
    /// Leave whatever the existing manifest holds.
    #[default]
    Keep,
    /// Remove the field.
    Clear,
    /// Set the field to this value.
    Set(String),
}

impl From<Option<String>> for ReferenceUpdate {
    fn from(value: Option<String>) -> Self {
        match value {
            None => ReferenceUpdate::Keep,
            Some(s) if s.is_empty() => ReferenceUpdate::Clear,
            Some(s) => ReferenceUpdate::Set(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Desired content
// ---------------------------------------------------------------------------

/// What the manifest should say about the managed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedSetDescriptor {
    pub repo: RepoName,
    /// Profiles applied, ascending.
    pub profiles: Vec<String>,
    /// Centrally owned paths. Never contains [`MANIFEST_PATH`].
    pub managed_files: Vec<String>,
    pub reference: ReferenceUpdate,
}

/// The complete file set an operator wants present in one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredContent {
    pub files: FileMap,
    pub meta: ManagedSetDescriptor,
}

impl DesiredContent {
    /// Build desired content, deriving the managed file list from `files`.
    pub fn new(
        repo: RepoName,
        files: FileMap,
        profiles: Vec<String>,
        reference: ReferenceUpdate,
    ) -> Self {
        let mut profiles = profiles;
        profiles.sort();
        profiles.dedup();

        // BTreeMap keys are already unique and ordinal-sorted.
        let managed_files = files
            .keys()
            .filter(|path| path.as_str() != MANIFEST_PATH)
            .cloned()
            .collect();

        Self {
            files,
            meta: ManagedSetDescriptor {
                repo,
                profiles,
                managed_files,
                reference,
            },
        }
    }
}

/// `true` when `path` is a relative, forward-slash path that stays inside the root.
pub fn is_safe_relative_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && !path.contains(':')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> FileMap {
        paths
            .iter()
            .map(|p| (p.to_string(), b"x".to_vec()))
            .collect()
    }

    #[test]
    fn repo_name_short_name() {
        assert_eq!(RepoName::from("LordMike/tool").short_name(), "tool");
        assert_eq!(RepoName::from("tool").short_name(), "tool");
    }

    #[test]
    fn managed_files_exclude_manifest_and_are_sorted() {
        let desired = DesiredContent::new(
            RepoName::from("o/r"),
            files(&["b.txt", MANIFEST_PATH, ".gitignore", "a/c.md"]),
            vec!["ci".into(), "base".into(), "ci".into()],
            ReferenceUpdate::Keep,
        );
        assert_eq!(
            desired.meta.managed_files,
            vec![".gitignore", "a/c.md", "b.txt"]
        );
        assert_eq!(desired.meta.profiles, vec!["base", "ci"]);
    }

    #[test]
    fn reference_tri_state_from_option() {
        assert_eq!(ReferenceUpdate::from(None), ReferenceUpdate::Keep);
        assert_eq!(
            ReferenceUpdate::from(Some(String::new())),
            ReferenceUpdate::Clear
        );
        assert_eq!(
            ReferenceUpdate::from(Some("v2".to_string())),
            ReferenceUpdate::Set("v2".to_string())
        );
    }

    #[test]
    fn safe_relative_paths() {
        assert!(is_safe_relative_path(".github/workflows/ci.yml"));
        assert!(is_safe_relative_path("_Local/.gitignore"));
        assert!(!is_safe_relative_path("/etc/passwd"));
        assert!(!is_safe_relative_path("../outside"));
        assert!(!is_safe_relative_path("a//b"));
        assert!(!is_safe_relative_path("a\\b"));
        assert!(!is_safe_relative_path("C:/x"));
        assert!(!is_safe_relative_path(""));
    }
}
