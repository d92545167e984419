// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metadata port: the session sidecar file.
//!
//! The sidecar is the stringly-typed contract between the engine, operators,
//! and external scripts (verify tooling writes the verify markers here).
//! Writes are serialized per session id so concurrent reactions within a
//! cycle cannot interleave partial updates.

use crate::EngineError;
use async_trait::async_trait;
use fleet_core::SessionId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// A partial metadata update. `None` deletes the key.
pub type MetaPatch = Vec<(String, Option<String>)>;

/// Key/value sidecar store, one document per session.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Apply a partial update. Single writer per session id.
    async fn update(&self, id: &SessionId, patch: MetaPatch) -> Result<(), EngineError>;

    /// Read the full sidecar. Missing file reads as empty.
    async fn read(&self, id: &SessionId) -> Result<HashMap<String, String>, EngineError>;
}

/// Convenience constructor for a single-key set.
pub fn set(key: &str, value: impl Into<String>) -> (String, Option<String>) {
    (key.to_string(), Some(value.into()))
}

/// Convenience constructor for a key deletion.
pub fn unset(key: &str) -> (String, Option<String>) {
    (key.to_string(), None)
}

/// File-backed metadata store: `{root}/{session id}/meta.toml`.
///
/// The per-session write lock is an async mutex so a slow disk never blocks
/// the runtime's worker threads for other sessions.
pub struct FsMetadataStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FsMetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, id: &SessionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.root.join(id.as_str()).join("meta.toml")
    }

    fn read_file(&self, id: &SessionId) -> Result<BTreeMap<String, String>, EngineError> {
        let path = self.path_for(id);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MetadataStore for FsMetadataStore {
    async fn update(&self, id: &SessionId, patch: MetaPatch) -> Result<(), EngineError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut doc = self.read_file(id)?;
        for (key, value) in patch {
            match value {
                Some(v) => {
                    doc.insert(key, v);
                }
                None => {
                    doc.remove(&key);
                }
            }
        }

        let path = self.path_for(id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // BTreeMap of strings always serializes.
        let text = toml::to_string(&doc).unwrap_or_default();
        // Write via a temp file and rename so readers never see a torn file.
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    async fn read(&self, id: &SessionId) -> Result<HashMap<String, String>, EngineError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        Ok(self.read_file(id)?.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
