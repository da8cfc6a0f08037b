//! In-memory blob backend for tests and ephemeral deployments.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BlobMeta, BlobStore};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use time::OffsetDateTime;

struct StoredBlob {
    data: Bytes,
    written_at: OffsetDateTime,
}

/// Blob store backed by a concurrent map.
#[derive(Default)]
pub struct MemoryBackend {
    blobs: DashMap<String, StoredBlob>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    Ok(())
}

#[async_trait]
impl BlobStore for MemoryBackend {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        Ok(self.blobs.contains_key(key))
    }

    async fn head(&self, key: &str) -> StorageResult<BlobMeta> {
        check_key(key)?;
        self.blobs
            .get(key)
            .map(|blob| BlobMeta {
                size: blob.data.len() as u64,
                last_modified: Some(blob.written_at),
            })
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        check_key(key)?;
        self.blobs
            .get(key)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        check_key(key)?;
        self.blobs.insert(
            key.to_string(),
            StoredBlob {
                data,
                written_at: OffsetDateTime::now_utc(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        check_key(key)?;
        self.blobs
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .blobs
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
