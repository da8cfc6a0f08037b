use std::sync::Arc;
use tempfile::TempDir;
use vault_storage::{BlobStore, FilesystemBackend, MemoryBackend};

/// Every backend under test, paired with the temp dir keeping it alive.
#[allow(dead_code)]
pub async fn all_backends() -> Vec<(Arc<dyn BlobStore>, Option<TempDir>)> {
    let dir = TempDir::new().unwrap();
    let fs = FilesystemBackend::new(dir.path()).await.unwrap();
    vec![
        (Arc::new(fs) as Arc<dyn BlobStore>, Some(dir)),
        (Arc::new(MemoryBackend::new()) as Arc<dyn BlobStore>, None),
    ]
}
