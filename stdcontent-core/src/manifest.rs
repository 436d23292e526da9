//! The `.standard_content.json` manifest.
//!
//! One manifest lives at the root of every target. It records which repo it
//! describes, the profiles applied, the centrally managed files and when the
//! set last changed:
//!
//! ```json
//! {
//!   "$schema": "https://github.com/LordMike/MBW.Tools.GhStandardContent/spec/StandardContent.json",
//!   "meta": {
//!     "repo": "owner/name",
//!     "profiles": ["base"],
//!     "files": [".gitignore", "LICENSE"],
//!     "last_updated": "2024-05-01T10:00:00.000000Z",
//!     "reference": "optional free text"
//!   }
//! }
//! ```
//!
//! A [`Manifest`] is an immutable snapshot. [`build`] always returns a new
//! value derived from an existing snapshot plus a descriptor, so the pristine
//! copy fetched from the target stays valid for drift comparison. Fields this
//! tool does not know about are carried over untouched.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::ManifestError;
use crate::types::{ManagedSetDescriptor, ReferenceUpdate};

/// Manifest location, relative to the target root.
pub const MANIFEST_PATH: &str = ".standard_content.json";

/// Value written to `$schema`.
pub const SCHEMA_URL: &str =
    "https://github.com/LordMike/MBW.Tools.GhStandardContent/spec/StandardContent.json";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ---------------------------------------------------------------------------
// Manifest value
// ---------------------------------------------------------------------------

/// A parsed manifest document. Equality is structural (JSON value equality).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    root: Map<String, Value>,
}

impl Manifest {
    /// Parse stored manifest bytes.
    ///
    /// Empty (or whitespace-only) content means "no manifest" and yields `None`.
    pub fn parse(bytes: &[u8]) -> Result<Option<Self>, ManifestError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        match serde_json::from_slice::<Value>(bytes).map_err(ManifestError::Parse)? {
            Value::Object(root) => Ok(Some(Self { root })),
            other => Err(ManifestError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    /// Indented JSON, two spaces, no trailing newline.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        serde_json::to_vec_pretty(&self.root).map_err(ManifestError::Serialize)
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn schema(&self) -> Option<&str> {
        self.root.get("$schema").and_then(Value::as_str)
    }

    pub fn repo(&self) -> Option<&str> {
        self.meta_str("repo")
    }

    pub fn profiles(&self) -> Vec<String> {
        self.meta_strings("profiles")
    }

    /// `meta.files`, as stored. Non-string entries are skipped.
    pub fn files(&self) -> Vec<String> {
        self.meta_strings("files")
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.meta_str("last_updated")
    }

    pub fn reference(&self) -> Option<&str> {
        self.meta_str("reference")
    }

    fn meta(&self) -> Option<&Map<String, Value>> {
        self.root.get("meta").and_then(Value::as_object)
    }

    fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta()?.get(key).and_then(Value::as_str)
    }

    fn meta_strings(&self, key: &str) -> Vec<String> {
        self.meta()
            .and_then(|meta| meta.get(key))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Build the manifest for `descriptor` on top of `existing`.
///
/// With `update_timestamp` set, `meta.last_updated` becomes the current UTC
/// instant. Without it the result is fully determined by the inputs, which is
/// what drift detection relies on.
pub fn build(
    existing: Option<&Manifest>,
    descriptor: &ManagedSetDescriptor,
    update_timestamp: bool,
) -> Manifest {
    build_at(existing, descriptor, update_timestamp.then(Utc::now))
}

/// [`build`] with an explicit timestamp; `None` leaves `last_updated` as it was.
pub fn build_at(
    existing: Option<&Manifest>,
    descriptor: &ManagedSetDescriptor,
    timestamp: Option<DateTime<Utc>>,
) -> Manifest {
    let mut root = existing.map(|m| m.root.clone()).unwrap_or_default();
    let mut meta = match root.get("meta") {
        Some(Value::Object(meta)) => meta.clone(),
        _ => Map::new(),
    };

    root.insert("$schema".to_owned(), Value::from(SCHEMA_URL));
    meta.insert("repo".to_owned(), Value::from(descriptor.repo.as_str()));
    meta.insert(
        "profiles".to_owned(),
        Value::from(descriptor.profiles.clone()),
    );
    meta.insert(
        "files".to_owned(),
        Value::from(sorted_managed(&descriptor.managed_files)),
    );

    if let Some(ts) = timestamp {
        meta.insert("last_updated".to_owned(), Value::from(format_timestamp(ts)));
    }

    match &descriptor.reference {
        ReferenceUpdate::Keep => {}
        ReferenceUpdate::Clear => {
            meta.shift_remove("reference");
        }
        ReferenceUpdate::Set(reference) => {
            meta.insert("reference".to_owned(), Value::from(reference.as_str()));
        }
    }

    root.insert("meta".to_owned(), Value::Object(meta));
    Manifest { root }
}

/// ISO-8601 UTC with microsecond precision, e.g. `2024-05-01T10:00:00.000000Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn sorted_managed(files: &[String]) -> Vec<String> {
    let set: BTreeSet<&str> = files
        .iter()
        .map(String::as_str)
        .filter(|path| *path != MANIFEST_PATH)
        .collect();
    set.into_iter().map(str::to_owned).collect()
}

// ---------------------------------------------------------------------------
// Removal detection
// ---------------------------------------------------------------------------

/// Paths listed in the previous manifest that are no longer managed.
///
/// A missing manifest, or one without `meta.files`, had nothing managed.
pub fn detect_removed_managed(
    existing: Option<&Manifest>,
    new_managed: &[String],
) -> BTreeSet<String> {
    let Some(existing) = existing else {
        return BTreeSet::new();
    };
    let keep: HashSet<&str> = new_managed.iter().map(String::as_str).collect();
    existing
        .files()
        .into_iter()
        .filter(|path| !keep.contains(path.as_str()))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
