//! Repository-local override merging.
//!
//! A repository can keep extra lines for a handful of managed files under
//! `_Local/`. Before diffing, the override content is appended to the managed
//! content so central updates and local additions coexist in one file.
//!
//! Matching is by exact path only: `.gitignore` pairs with `_Local/.gitignore`,
//! and `sub/.gitignore` has no override unless the table names it.

use crate::normalize::normalize;
use crate::types::{FileMap, FileSnapshot};

/// Directory holding override files, relative to the repository root.
pub const LOCAL_OVERRIDE_DIR: &str = "_Local";

/// Managed files that accept a `_Local/` override by default.
const STANDARD_OVERRIDES: [&str; 4] = [
    ".gitignore",
    ".gitattributes",
    ".dockerignore",
    ".editorconfig",
];

/// One managed path and the override path appended onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverridePair {
    pub managed: String,
    pub local: String,
}

/// Immutable table of override pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideTable {
    pairs: Vec<OverridePair>,
}

impl Default for OverrideTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl OverrideTable {
    /// `.gitignore`, `.gitattributes`, `.dockerignore`, `.editorconfig` → `_Local/<name>`.
    pub fn standard() -> Self {
        Self::new(
            STANDARD_OVERRIDES
                .iter()
                .map(|name| (name.to_string(), format!("{LOCAL_OVERRIDE_DIR}/{name}"))),
        )
    }

    pub fn new<S: Into<String>>(pairs: impl IntoIterator<Item = (S, S)>) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(managed, local)| OverridePair {
                    managed: managed.into(),
                    local: local.into(),
                })
                .collect(),
        }
    }

    /// Override paths worth fetching: those whose managed file is part of `desired`.
    pub fn override_paths_for<'a>(
        &'a self,
        desired: &'a FileMap,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |pair| desired.contains_key(&pair.managed))
            .map(|pair| pair.local.as_str())
    }

    /// Append fetched override content onto the matching desired files.
    ///
    /// Only `desired` is modified. Returns the managed paths that received an
    /// override, in table order.
    pub fn merge(&self, desired: &mut FileMap, current: &FileSnapshot) -> Vec<String> {
        let mut merged = Vec::new();
        for pair in &self.pairs {
            let Some(standard) = desired.get_mut(&pair.managed) else {
                continue;
            };
            let Some(Some(local)) = current.get(&pair.local) else {
                continue;
            };
            if local.is_empty() {
                continue;
            }

            *standard = append_override(standard, local);
            tracing::debug!(managed = %pair.managed, local = %pair.local, "merged local override");
            merged.push(pair.managed.clone());
        }
        merged
    }
}

/// Normalize both sides and join them, inserting a single `\n` only when the
/// managed content is non-empty and does not already end with one.
pub fn append_override(managed: &[u8], local: &[u8]) -> Vec<u8> {
    let standard = normalize(managed);
    let local = normalize(local);

    let needs_newline = standard.last().is_some_and(|&b| b != b'\n');
    let mut out = Vec::with_capacity(standard.len() + usize::from(needs_newline) + local.len());
    out.extend_from_slice(&standard);
    if needs_newline {
        out.push(b'\n');
    }
    out.extend_from_slice(&local);
    out
}
