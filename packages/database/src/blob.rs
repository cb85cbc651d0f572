//! Image blob storage.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::StoreError;

/// Stores uploaded images and hands back a retrievable reference.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the reference to record on
    /// the report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the blob cannot be written.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str)
    -> Result<String, StoreError>;
}

/// Writes blobs as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StoreError> {
        let file_name = format!("{key}.{}", extension_for(content_type));
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        log::debug!("Stored {} byte image at {}", bytes.len(), path.display());
        Ok(format!("file://{}", path.display()))
    }
}

/// Keeps blobs in memory. Used by tests and the in-memory server mode.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, (String, Vec<u8>)>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.lock().map_or(0, |b| b.len())
    }

    /// Whether no blobs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StoreError> {
        self.blobs
            .lock()
            .map_err(|_| StoreError::Database {
                message: "blob store mutex poisoned".to_string(),
            })?
            .insert(key.to_string(), (content_type.to_string(), bytes.to_vec()));
        Ok(format!("memory://{key}"))
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }

    #[tokio::test]
    async fn memory_store_returns_reference() {
        let store = MemoryBlobStore::new();
        let reference = store.put("r-1", b"img", "image/png").await.unwrap();
        assert_eq!(reference, "memory://r-1");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn fs_store_writes_file() {
        let root = std::env::temp_dir().join(format!("alerta-blobs-{}", uuid::Uuid::new_v4()));
        let store = FsBlobStore::new(&root);
        let reference = store.put("r-1", b"jpeg-bytes", "image/jpeg").await.unwrap();

        assert!(reference.ends_with("r-1.jpg"));
        let written = tokio::fs::read(root.join("r-1.jpg")).await.unwrap();
        assert_eq!(written, b"jpeg-bytes");
    }
}
