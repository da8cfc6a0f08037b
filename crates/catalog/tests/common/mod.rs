//! Fault-injecting store wrappers and a catalog harness.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use time::OffsetDateTime;
use tokio::time::Duration;
use vault_catalog::{Catalog, UploadRequest};
use vault_core::config::CatalogConfig;
use vault_core::{Asset, AssetId, AssetPatch, NewAsset, NewTag, Tag, TagId, TagPatch};
use vault_metadata::{
    AssetFilter, AssetRepo, Association, MetadataError, MetadataResult, MetadataStore,
    SqliteStore, TagRepo, TombstoneRepo, TombstoneRow,
};
use vault_storage::{BlobMeta, BlobStore, MemoryBackend, StorageError, StorageResult};

fn injected() -> MetadataError {
    MetadataError::Internal("injected failure".to_string())
}

/// SQLite store with switchable failures and call counters.
pub struct FaultyMetadata {
    inner: SqliteStore,
    pub fail_create_asset: AtomicBool,
    pub fail_delete_asset: AtomicBool,
    pub fail_list_assets: AtomicBool,
    pub fail_list_associations: AtomicBool,
    pub list_assets_calls: AtomicUsize,
    pub delete_asset_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FaultyMetadata {
    pub async fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().await.unwrap(),
            fail_create_asset: AtomicBool::new(false),
            fail_delete_asset: AtomicBool::new(false),
            fail_list_assets: AtomicBool::new(false),
            fail_list_associations: AtomicBool::new(false),
            list_assets_calls: AtomicUsize::new(0),
            delete_asset_calls: AtomicUsize::new(0),
        }
    }

    /// The unwrapped store, for out-of-band inspection and edits.
    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    pub fn list_calls(&self) -> usize {
        self.list_assets_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_asset_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetRepo for FaultyMetadata {
    async fn create_asset(&self, asset: &NewAsset) -> MetadataResult<Asset> {
        if self.fail_create_asset.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.create_asset(asset).await
    }

    async fn get_asset(&self, id: AssetId) -> MetadataResult<Option<Asset>> {
        self.inner.get_asset(id).await
    }

    async fn update_asset(
        &self,
        id: AssetId,
        patch: &AssetPatch,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<Asset> {
        self.inner.update_asset(id, patch, updated_at).await
    }

    async fn delete_asset(&self, id: AssetId) -> MetadataResult<()> {
        self.delete_asset_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete_asset.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.delete_asset(id).await
    }

    async fn list_assets(&self, filter: &AssetFilter) -> MetadataResult<Vec<Asset>> {
        self.list_assets_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_assets.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.list_assets(filter).await
    }
}

#[async_trait]
impl TagRepo for FaultyMetadata {
    async fn create_tag(&self, tag: &Tag) -> MetadataResult<()> {
        self.inner.create_tag(tag).await
    }

    async fn get_tag(&self, id: TagId) -> MetadataResult<Option<Tag>> {
        self.inner.get_tag(id).await
    }

    async fn update_tag(&self, id: TagId, patch: &TagPatch) -> MetadataResult<Tag> {
        self.inner.update_tag(id, patch).await
    }

    async fn delete_tag(&self, id: TagId) -> MetadataResult<()> {
        self.inner.delete_tag(id).await
    }

    async fn list_tags(&self) -> MetadataResult<Vec<Tag>> {
        self.inner.list_tags().await
    }

    async fn set_association(
        &self,
        asset_id: AssetId,
        tag_id: TagId,
        present: bool,
    ) -> MetadataResult<bool> {
        self.inner.set_association(asset_id, tag_id, present).await
    }

    async fn tags_for_asset(&self, asset_id: AssetId) -> MetadataResult<Vec<Tag>> {
        self.inner.tags_for_asset(asset_id).await
    }

    async fn list_associations(&self) -> MetadataResult<Vec<Association>> {
        if self.fail_list_associations.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.list_associations().await
    }
}

#[async_trait]
impl TombstoneRepo for FaultyMetadata {
    async fn create_tombstone(
        &self,
        asset_id: AssetId,
        blob_removed_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        self.inner.create_tombstone(asset_id, blob_removed_at).await
    }

    async fn list_tombstones(&self) -> MetadataResult<Vec<TombstoneRow>> {
        self.inner.list_tombstones().await
    }
}

#[async_trait]
impl MetadataStore for FaultyMetadata {
    async fn migrate(&self) -> MetadataResult<()> {
        self.inner.migrate().await
    }

    async fn health_check(&self) -> MetadataResult<()> {
        self.inner.health_check().await
    }
}

/// In-memory blob store with switchable failures, call counters and an
/// optional delay on deletes.
#[derive(Default)]
pub struct FaultyBlobs {
    inner: MemoryBackend,
    pub fail_put: AtomicBool,
    pub fail_delete: AtomicBool,
    pub delete_delay_ms: AtomicU64,
    pub delete_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FaultyBlobs {
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FaultyBlobs {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<BlobMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected failure".to_string()));
        }
        self.inner.put(key, data).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delete_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected failure".to_string()));
        }
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    fn backend_name(&self) -> &'static str {
        "faulty-memory"
    }
}

pub struct Harness {
    pub catalog: Catalog,
    pub metadata: Arc<FaultyMetadata>,
    pub blobs: Arc<FaultyBlobs>,
}

#[allow(dead_code)]
pub async fn harness() -> Harness {
    harness_with(CatalogConfig::default(), |_, _| {}).await
}

/// Build a harness, applying `setup` to the stores before the catalog opens.
pub async fn harness_with(
    config: CatalogConfig,
    setup: impl FnOnce(&FaultyMetadata, &FaultyBlobs),
) -> Harness {
    let metadata = Arc::new(FaultyMetadata::new().await);
    let blobs = Arc::new(FaultyBlobs::default());
    setup(&metadata, &blobs);
    let catalog = Catalog::open(metadata.clone(), blobs.clone(), &config).await;
    Harness {
        catalog,
        metadata,
        blobs,
    }
}

#[allow(dead_code)]
impl Harness {
    pub async fn upload(&self, filename: &str, description: Option<&str>) -> Asset {
        let mut request = UploadRequest::new(filename, "image/png", Bytes::from(filename.to_string()));
        request.description = description.map(str::to_string);
        let asset = self.catalog.upload(request).await.unwrap();
        // Distinct creation timestamps keep ordering assertions meaningful.
        tokio::time::sleep(Duration::from_millis(2)).await;
        asset
    }

    pub async fn tag(&self, name: &str) -> Tag {
        self.catalog
            .create_tag(NewTag {
                name: name.to_string(),
                color: None,
            })
            .await
            .unwrap()
    }
}

#[allow(dead_code)]
pub fn ids(assets: &[Asset]) -> Vec<AssetId> {
    assets.iter().map(|a| a.id).collect()
}
