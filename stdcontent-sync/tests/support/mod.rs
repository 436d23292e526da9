//! In-memory backend shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use stdcontent_core::{
    ChangeSet, DesiredContent, FileMap, FileSnapshot, Manifest, ReferenceUpdate, RemovalSet,
    RepoName, MANIFEST_PATH,
};
use stdcontent_sync::{ContentBackend, SyncError};

pub const REPO: &str = "LordMike/example";

/// A content store held in memory that records every call it receives.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: Mutex<BTreeMap<String, Vec<u8>>>,
    fetches: Mutex<Vec<BTreeSet<String>>>,
    applies: Mutex<Vec<(ChangeSet, RemovalSet)>>,
    fail_fetch: bool,
    fail_apply: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: &[(&str, &[u8])]) -> Self {
        let backend = Self::new();
        for (path, bytes) in files {
            backend.put(path, bytes);
        }
        backend
    }

    pub fn failing_fetch() -> Self {
        Self {
            fail_fetch: true,
            ..Self::default()
        }
    }

    pub fn failing_apply() -> Self {
        Self {
            fail_apply: true,
            ..Self::default()
        }
    }

    pub fn put(&self, path: &str, bytes: &[u8]) {
        self.store
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.store.lock().unwrap().get(path).cloned()
    }

    pub fn manifest(&self) -> Option<Manifest> {
        self.get(MANIFEST_PATH)
            .and_then(|bytes| Manifest::parse(&bytes).unwrap())
    }

    pub fn apply_calls(&self) -> Vec<(ChangeSet, RemovalSet)> {
        self.applies.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> Vec<BTreeSet<String>> {
        self.fetches.lock().unwrap().clone()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("simulated backend outage")]
pub struct Outage;

#[async_trait]
impl ContentBackend for MemoryBackend {
    async fn fetch_files(
        &self,
        _repo: &RepoName,
        paths: &BTreeSet<String>,
    ) -> Result<FileSnapshot, SyncError> {
        self.fetches.lock().unwrap().push(paths.clone());
        if self.fail_fetch {
            return Err(SyncError::Backend(Box::new(Outage)));
        }
        let store = self.store.lock().unwrap();
        Ok(paths
            .iter()
            .map(|path| (path.clone(), store.get(path).cloned()))
            .collect())
    }

    async fn apply_files(
        &self,
        _repo: &RepoName,
        files: &ChangeSet,
        removals: &RemovalSet,
    ) -> Result<(), SyncError> {
        self.applies
            .lock()
            .unwrap()
            .push((files.clone(), removals.clone()));
        if self.fail_apply {
            return Err(SyncError::Backend(Box::new(Outage)));
        }
        let mut store = self.store.lock().unwrap();
        for (path, bytes) in files {
            store.insert(path.clone(), bytes.clone());
        }
        for path in removals {
            store.remove(path);
        }
        Ok(())
    }
}

/// Desired content for [`REPO`] with the single profile `base`.
pub fn desired(files: &[(&str, &str)]) -> DesiredContent {
    desired_with_reference(files, ReferenceUpdate::Keep)
}

pub fn desired_with_reference(files: &[(&str, &str)], reference: ReferenceUpdate) -> DesiredContent {
    let files: FileMap = files
        .iter()
        .map(|(path, text)| (path.to_string(), text.as_bytes().to_vec()))
        .collect();
    DesiredContent::new(RepoName::from(REPO), files, vec!["base".to_string()], reference)
}
