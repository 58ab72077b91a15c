//! Opaque byte-blob storage backends.

use crate::error::{ModelStoreError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// Put/get interface for named byte blobs
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous blob
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Fetch the blob stored under `key`
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    fn exists(&self, key: &str) -> bool;

    /// All stored keys, sorted
    fn list(&self) -> Result<Vec<String>>;

    /// Backend name for logs
    fn backend_type(&self) -> &'static str;
}

/// Blobs held in a map, for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> ModelStoreError {
    ModelStoreError::Io(std::io::Error::other("blob store lock poisoned"))
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(|_| poisoned())?;
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().map_err(|_| poisoned())?;
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| ModelStoreError::NotFound(key.to_string()))
    }

    fn exists(&self, key: &str) -> bool {
        self.blobs
            .read()
            .map(|blobs| blobs.contains_key(key))
            .unwrap_or(false)
    }

    fn list(&self) -> Result<Vec<String>> {
        let blobs = self.blobs.read().map_err(|_| poisoned())?;
        let mut keys: Vec<String> = blobs.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

/// One file per blob under a base directory
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    base_path: PathBuf,
}

const BLOB_EXTENSION: &str = "json";

impl FsBlobStore {
    /// Use `base_path` as the store root, creating it if needed
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", key, BLOB_EXTENSION))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(key);
        // Write then rename so readers never see a partial blob
        let tmp = self.base_path.join(format!(".{}.tmp", key));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        debug!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        match fs::read(self.blob_path(key)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ModelStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.blob_path(key).is_file()
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BLOB_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn backend_type(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn BlobStore) {
        assert!(!store.exists("a"));
        assert!(matches!(store.get("a"), Err(ModelStoreError::NotFound(_))));

        store.put("b", b"second").unwrap();
        store.put("a", b"first").unwrap();
        store.put("a", b"replaced").unwrap();

        assert!(store.exists("a"));
        assert_eq!(store.get("a").unwrap(), b"replaced");
        assert_eq!(store.list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_memory_blob_store() {
        exercise(&MemoryBlobStore::new());
    }

    #[test]
    fn test_fs_blob_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("models")).unwrap();
        exercise(&store);
        assert!(store.base_path().join("a.json").is_file());
    }
}
