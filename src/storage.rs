//! Persisted Storage Module
//!
//! Whole-blob key/value persistence for cache snapshots. No partial or
//! range updates: every write replaces the blob under its key.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, TransitError};

/// Durable blob store keyed by fixed logical names.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads the blob under `key`, or None if it was never written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the blob under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

// == File Storage ==
/// Stores each blob as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a storage rooted at `dir`. The directory is created lazily
    /// on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(TransitError::Storage(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TransitError::Storage(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Readers see either the old blob or the new one
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Persisted {} ({} bytes)", path.display(), value.len());
        Ok(())
    }
}

// == Memory Storage ==
/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs written so far.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_get_set() {
        let storage = MemoryStorage::new();
        assert!(storage.get("kmb_stops_cache").await.unwrap().is_none());

        storage.set("kmb_stops_cache", "{}").await.unwrap();
        storage.set("kmb_stops_cache", "[]").await.unwrap();

        assert_eq!(storage.get("kmb_stops_cache").await.unwrap().as_deref(), Some("[]"));
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert!(storage.get("kmb_eta_cache").await.unwrap().is_none());

        storage.set("kmb_eta_cache", r#"{"a":1}"#).await.unwrap();
        let loaded = storage.get("kmb_eta_cache").await.unwrap();

        assert_eq!(loaded.as_deref(), Some(r#"{"a":1}"#));
        assert!(dir.path().join("nested/kmb_eta_cache.json").exists());
        assert!(!dir.path().join("nested/kmb_eta_cache.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let result = storage.set("../escape", "x").await;
        assert!(matches!(result, Err(TransitError::Storage(_))));
    }
}
