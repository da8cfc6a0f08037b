//! Blob store trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Durable byte storage keyed by opaque path.
///
/// The catalog treats implementations as external, potentially slow I/O:
/// every method is a single suspending call with no ordering guarantee
/// relative to calls on other keys.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Check if a blob exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get a blob's size without fetching content.
    async fn head(&self, key: &str) -> StorageResult<BlobMeta>;

    /// Get a blob's content.
    ///
    /// Returns `StorageError::NotFound` if the key is absent.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put a blob atomically, replacing any previous content.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete a blob.
    ///
    /// Returns `StorageError::NotFound` if the key is absent.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List blob keys with a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get the name of this storage backend.
    ///
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Metadata about a stored blob.
#[derive(Clone, Debug)]
pub struct BlobMeta {
    /// Blob size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
}
