//! `repos.json` configuration.
//!
//! # Layout
//!
//! ```json
//! {
//!   "content": {
//!     "base":   { "LICENSE": "files/LICENSE", ".gitignore": "files/gitignore" },
//!     "dotnet": { ".editorconfig": "files/dotnet.editorconfig" }
//!   },
//!   "repositories": {
//!     "LordMike/example": { "base": true, "dotnet": true }
//!   }
//! }
//! ```
//!
//! `content` maps profile names to `target path → source file`; source files
//! resolve relative to the directory holding `repos.json`. `repositories`
//! maps each repository to the profiles it opts into. Repository names are
//! matched case-insensitively.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{io_err, ConfigError};
use crate::normalize::normalize_in_place;
use crate::types::{
    is_safe_relative_path, DesiredContent, FileMap, ReferenceUpdate, RepoName,
};

/// Raw document shape.
#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    content: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    repositories: BTreeMap<String, BTreeMap<String, Value>>,
}

/// One configured repository and the profile flags it sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryEntry {
    pub name: RepoName,
    /// Profile name → enabled. Non-boolean settings are not profile flags and are dropped.
    pub flags: BTreeMap<String, bool>,
}

/// Loaded `repos.json`, with source paths resolved to absolute paths.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    content: BTreeMap<String, BTreeMap<String, PathBuf>>,
    repositories: Vec<RepositoryEntry>,
}

impl RepositoryConfig {
    /// Load and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let document: ConfigDocument =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::from_document(document, &base_dir)
    }

    /// Parse a config held in memory; `base_dir` anchors relative source paths.
    pub fn from_json_str(json: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let document: ConfigDocument =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse {
                path: base_dir.to_path_buf(),
                source: e,
            })?;
        Self::from_document(document, base_dir)
    }

    fn from_document(document: ConfigDocument, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut content = BTreeMap::new();
        for (profile, files) in document.content {
            let mut resolved = BTreeMap::new();
            for (target, source) in files {
                if !is_safe_relative_path(&target) {
                    return Err(ConfigError::InvalidTargetPath {
                        profile,
                        path: target,
                    });
                }
                resolved.insert(target, base_dir.join(source));
            }
            content.insert(profile, resolved);
        }

        let repositories = document
            .repositories
            .into_iter()
            .map(|(name, settings)| RepositoryEntry {
                name: RepoName::from(name),
                flags: settings
                    .into_iter()
                    .filter_map(|(key, value)| value.as_bool().map(|on| (key, on)))
                    .collect(),
            })
            .collect();

        Ok(Self {
            content,
            repositories,
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn repositories(&self) -> &[RepositoryEntry] {
        &self.repositories
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.content.keys().map(String::as_str)
    }

    /// Exact (case-insensitive) match on the full name, else the first match
    /// on the part after `/`.
    pub fn find(&self, name: &str) -> Option<&RepositoryEntry> {
        self.repositories
            .iter()
            .find(|repo| repo.name.as_str().eq_ignore_ascii_case(name))
            .or_else(|| {
                self.repositories
                    .iter()
                    .find(|repo| repo.name.short_name().eq_ignore_ascii_case(name))
            })
    }

    /// Every repository for `None`, otherwise the single match for `name`.
    pub fn select(&self, name: Option<&str>) -> Result<Vec<&RepositoryEntry>, ConfigError> {
        match name {
            None => Ok(self.repositories.iter().collect()),
            Some(name) => self
                .find(name)
                .map(|repo| vec![repo])
                .ok_or_else(|| ConfigError::UnknownRepository {
                    name: name.to_string(),
                }),
        }
    }

    /// Work out which repository a local checkout at `local_path` represents.
    ///
    /// An explicit `name` wins. Otherwise the checkout's directory name must
    /// match exactly one repository's short name.
    pub fn resolve_local(
        &self,
        name: Option<&str>,
        local_path: &Path,
    ) -> Result<&RepositoryEntry, ConfigError> {
        if let Some(name) = name {
            let found = if name.contains('/') {
                self.repositories
                    .iter()
                    .find(|repo| repo.name.as_str().eq_ignore_ascii_case(name))
            } else {
                self.find(name)
            };
            return found.ok_or_else(|| ConfigError::UnknownRepository {
                name: name.to_string(),
            });
        }

        let canonical =
            std::fs::canonicalize(local_path).unwrap_or_else(|_| local_path.to_path_buf());
        let folder = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let matches: Vec<&RepositoryEntry> = self
            .repositories
            .iter()
            .filter(|repo| repo.name.short_name().eq_ignore_ascii_case(&folder))
            .collect();

        match matches.as_slice() {
            [] => Err(ConfigError::UnknownRepository { name: folder }),
            [single] => Ok(*single),
            many => Err(ConfigError::AmbiguousRepository {
                name: folder,
                matches: many.iter().map(|r| r.name.to_string()).collect(),
            }),
        }
    }

    /// Enabled profiles that exist in `content`, ascending.
    pub fn profiles_for(&self, repo: &RepositoryEntry) -> Vec<String> {
        self.content
            .keys()
            .filter(|profile| repo.flags.get(*profile).copied().unwrap_or(false))
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Desired content
    // -----------------------------------------------------------------------

    /// Read every source file of the repository's profiles into [`DesiredContent`].
    ///
    /// Content is normalized on load. A target path claimed by two profiles is
    /// an error rather than a silent overwrite.
    pub fn desired_content(
        &self,
        repo: &RepositoryEntry,
        reference: ReferenceUpdate,
    ) -> Result<DesiredContent, ConfigError> {
        let profiles = self.profiles_for(repo);

        let mut files = FileMap::new();
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for profile in &profiles {
            let Some(entries) = self.content.get(profile) else {
                continue;
            };
            for (target, source) in entries {
                if let Some(first) = owners.insert(target, profile) {
                    return Err(ConfigError::DuplicatePath {
                        path: target.clone(),
                        first: first.to_string(),
                        second: profile.clone(),
                    });
                }
                let mut bytes = std::fs::read(source).map_err(|e| io_err(source, e))?;
                normalize_in_place(&mut bytes);
                files.insert(target.clone(), bytes);
            }
        }

        tracing::debug!(
            repository = %repo.name,
            profiles = ?profiles,
            files = files.len(),
            "built desired content",
        );

        Ok(DesiredContent::new(
            repo.name.clone(),
            files,
            profiles,
            reference,
        ))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
