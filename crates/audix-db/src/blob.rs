//! Content-addressable blob store for attachment bytes.
//!
//! Keys are `blobs/<sha256 hex>` of the content, so storing identical bytes
//! twice yields the same key and a single object. The service only persists
//! metadata; whoever holds the key can store, fetch or delete the bytes.

use std::path::Path;
use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use sha2::{Digest, Sha256};

use crate::error::DatabaseError;

const KEY_PREFIX: &str = "blobs";

#[derive(Debug, Clone)]
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
}

impl BlobStore {
    /// Wrap any `object_store` backend.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Volatile store for tests and throwaway servers.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Store blobs as files under `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created or opened.
    pub fn local(root: &Path) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(root).map_err(|e| {
            DatabaseError::InvalidState(format!(
                "cannot create blob root {}: {e}",
                root.display()
            ))
        })?;
        let fs = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new(Arc::new(fs)))
    }

    /// The key under which `bytes` is (or would be) stored.
    #[must_use]
    pub fn key_for(bytes: &[u8]) -> String {
        format!("{KEY_PREFIX}/{}", hex::encode(Sha256::digest(bytes)))
    }

    /// Store `bytes` and return its key. Storing existing content is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Blob` if the backend write fails.
    pub async fn store(&self, bytes: Vec<u8>) -> Result<String, DatabaseError> {
        let key = Self::key_for(&bytes);
        let path = ObjectPath::from(key.as_str());
        match self.store.head(&path).await {
            Ok(_) => {
                tracing::debug!(%key, "blob already present");
                return Ok(key);
            }
            Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        let size = bytes.len();
        self.store.put(&path, PutPayload::from(bytes)).await?;
        tracing::debug!(%key, size, "blob stored");
        Ok(key)
    }

    /// Fetch the bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Blob` if the key is absent or the read fails.
    pub async fn fetch(&self, key: &str) -> Result<Vec<u8>, DatabaseError> {
        let result = self.store.get(&ObjectPath::from(key)).await?;
        Ok(result.bytes().await?.to_vec())
    }

    /// Delete the bytes under `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Blob` if the backend delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DatabaseError> {
        match self.store.delete(&ObjectPath::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
