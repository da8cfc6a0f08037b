//! Caller-facing catalog surface.
//!
//! Every mutation is applied to the authoritative stores first; the tag index
//! and result cache are only touched after the store confirms the outcome.

use crate::cache::{CacheCoordinator, CacheKey, Cacheable, Lookup, Mutation};
use crate::deletion::{DeletionPipeline, DeletionReport, OrphanLedger, OrphanRecord};
use crate::error::{CatalogError, CatalogResult};
use crate::metrics;
use crate::planner::SearchQueryPlanner;
use crate::tag_index::TagIndex;
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use vault_core::config::CatalogConfig;
use vault_core::{
    Asset, AssetId, AssetPatch, CatalogStats, NewAsset, NewTag, SearchQuery, Tag, TagId, TagPatch,
};
use vault_metadata::MetadataStore;
use vault_storage::BlobStore;

/// Fields of a new upload.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub filename: String,
    /// Declared content type; blank means `application/octet-stream`.
    pub content_type: String,
    pub data: Bytes,
    pub description: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<f64>,
    pub owner_id: Option<Uuid>,
}

impl UploadRequest {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
            description: None,
            width: None,
            height: None,
            duration_secs: None,
            owner_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn into_new_asset(self) -> CatalogResult<(NewAsset, Bytes)> {
        let mut new = NewAsset::from_upload(
            &self.filename,
            &self.content_type,
            self.data.len() as u64,
        )?;
        if let Some(duration) = self.duration_secs
            && !(duration.is_finite() && duration >= 0.0)
        {
            return Err(CatalogError::Validation(
                "duration must be a non-negative number of seconds".to_string(),
            ));
        }
        new.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        new.width = self.width;
        new.height = self.height;
        new.duration_secs = self.duration_secs;
        new.owner_id = self.owner_id;
        Ok((new, self.data))
    }
}

/// The asset catalog: search, upload, edit, tag and delete.
pub struct Catalog {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    index: Arc<TagIndex>,
    ledger: Arc<OrphanLedger>,
    planner: SearchQueryPlanner,
    deletion: DeletionPipeline,
    cache: Arc<CacheCoordinator>,
}

impl Catalog {
    /// Build a catalog over the given stores, warm the tag index and adopt
    /// tombstones of unfinished deletions.
    ///
    /// A failed warm-up is not fatal: the index stays cold and tag filters
    /// are evaluated by the metadata store until a full listing warms it.
    pub async fn open(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        config: &CatalogConfig,
    ) -> Self {
        let index = Arc::new(TagIndex::new());
        let ledger = Arc::new(OrphanLedger::new());
        let cache = Arc::new(CacheCoordinator::new(
            config.cache_enabled,
            config.max_cached_queries,
        ));

        match metadata.list_associations().await {
            Ok(associations) => {
                let count = associations.len();
                index.rebuild(associations);
                info!(associations = count, "Tag index warmed");
            }
            Err(e) => {
                warn!(error = %e, "Tag index warm-up failed; tag filters fall back to the metadata store");
            }
        }

        match metadata.list_tombstones().await {
            Ok(tombstones) => {
                let count = tombstones.len();
                for tombstone in tombstones {
                    ledger.restore(tombstone);
                }
                if count > 0 {
                    warn!(orphans = count, "Recovered unfinished deletions; retry delete to finish them");
                }
            }
            Err(e) => {
                warn!(error = %e, "Tombstone load failed; unfinished deletions stay visible until retried");
            }
        }

        Self {
            planner: SearchQueryPlanner::new(metadata.clone(), index.clone(), ledger.clone()),
            deletion: DeletionPipeline::new(
                metadata.clone(),
                blobs.clone(),
                ledger.clone(),
                index.clone(),
                cache.clone(),
            ),
            cache,
            metadata,
            blobs,
            index,
            ledger,
        }
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn tag_index(&self) -> &TagIndex {
        &self.index
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Ordered, duplicate-free assets matching the query.
    #[instrument(skip(self), fields(text = ?query.text(), tag_filter = query.is_tag_filtered()))]
    pub async fn search(&self, query: &SearchQuery) -> CatalogResult<Vec<Asset>> {
        let start = Instant::now();
        metrics::SEARCHES.inc();
        let result = self
            .cached(CacheKey::Search(query.clone()), || {
                self.planner.execute(query)
            })
            .await;
        metrics::SEARCH_DURATION.observe(start.elapsed().as_secs_f64());
        result
    }

    /// A single asset. Assets pending deletion are reported as missing.
    pub async fn get_asset(&self, id: AssetId) -> CatalogResult<Asset> {
        self.ensure_visible(id)?;
        self.metadata
            .get_asset(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("asset {id}")))
    }

    /// An asset together with its bytes.
    pub async fn download(&self, id: AssetId) -> CatalogResult<(Asset, Bytes)> {
        let asset = self.get_asset(id).await?;
        match self.blobs.get(&asset.blob_key).await {
            Ok(data) => Ok((asset, data)),
            Err(e) if e.is_not_found() => {
                warn!(asset_id = %id, blob_key = %asset.blob_key, "Metadata references a missing blob");
                Err(CatalogError::OrphanedMetadata {
                    asset_id: id,
                    message: format!("blob {} is missing", asset.blob_key),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_tags(&self) -> CatalogResult<Vec<Tag>> {
        self.cached(CacheKey::Tags, || async {
            self.metadata.list_tags().await.map_err(CatalogError::from)
        })
        .await
    }

    /// Overview counters over the visible catalog.
    pub async fn stats(&self) -> CatalogResult<CatalogStats> {
        self.cached(CacheKey::Stats, || async {
            let assets = self.search(&SearchQuery::all()).await?;
            let tags = self.list_tags().await?;
            Ok::<_, CatalogError>(CatalogStats::compute(&assets, tags.len()))
        })
        .await
    }

    /// The most recently created assets.
    pub async fn recent(&self, limit: usize) -> CatalogResult<Vec<Asset>> {
        let mut assets = self.search(&SearchQuery::all()).await?;
        assets.truncate(limit);
        Ok(assets)
    }

    /// Assets stuck between blob and metadata removal.
    pub fn orphaned_assets(&self) -> Vec<OrphanRecord> {
        self.ledger.list()
    }

    // =========================================================================
    // Asset mutations
    // =========================================================================

    /// Store the bytes, then the record. If the record cannot be written the
    /// blob is removed again and the metadata error is returned.
    #[instrument(skip(self, request), fields(filename = %request.filename, size = request.data.len()))]
    pub async fn upload(&self, request: UploadRequest) -> CatalogResult<Asset> {
        let (new, data) = request.into_new_asset()?;
        let size = data.len() as u64;

        if let Err(e) = self.blobs.put(&new.blob_key, data).await {
            metrics::record_upload("blob_failed");
            warn!(error = %e, blob_key = %new.blob_key, "Blob write failed");
            return Err(e.into());
        }

        match self.metadata.create_asset(&new).await {
            Ok(asset) => {
                metrics::record_upload("stored");
                metrics::BYTES_UPLOADED.inc_by(size);
                self.cache.invalidate(Mutation::AssetCreated);
                info!(asset_id = %asset.id, "Asset uploaded");
                Ok(asset)
            }
            Err(e) => {
                metrics::record_upload("metadata_failed");
                if let Err(cleanup) = self.blobs.delete(&new.blob_key).await {
                    warn!(
                        blob_key = %new.blob_key,
                        error = %cleanup,
                        "Failed to remove blob after metadata write failure"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Rename and/or re-describe an asset.
    pub async fn edit_asset(&self, id: AssetId, patch: AssetPatch) -> CatalogResult<Asset> {
        let patch = patch.validated()?;
        self.ensure_visible(id)?;
        if patch.is_empty() {
            return self.get_asset(id).await;
        }

        let asset = self
            .metadata
            .update_asset(id, &patch, OffsetDateTime::now_utc())
            .await?;
        self.cache.invalidate(Mutation::AssetEdited);
        Ok(asset)
    }

    /// Delete an asset's blob and record. See [`DeletionPipeline`].
    #[instrument(skip(self))]
    pub async fn delete_asset(&self, id: AssetId) -> CatalogResult<DeletionReport> {
        self.deletion.delete(id).await
    }

    pub async fn tag_asset(&self, asset_id: AssetId, tag_id: TagId) -> CatalogResult<()> {
        self.set_association(asset_id, tag_id, true).await
    }

    pub async fn untag_asset(&self, asset_id: AssetId, tag_id: TagId) -> CatalogResult<()> {
        self.set_association(asset_id, tag_id, false).await
    }

    async fn set_association(
        &self,
        asset_id: AssetId,
        tag_id: TagId,
        present: bool,
    ) -> CatalogResult<()> {
        self.ensure_visible(asset_id)?;
        let changed = self
            .metadata
            .set_association(asset_id, tag_id, present)
            .await?;
        self.index.update(asset_id, tag_id, present);
        if changed {
            self.cache.invalidate(if present {
                Mutation::TagAttached
            } else {
                Mutation::TagDetached
            });
        }
        Ok(())
    }

    // =========================================================================
    // Tag mutations
    // =========================================================================

    pub async fn create_tag(&self, new: NewTag) -> CatalogResult<Tag> {
        let tag = new.into_tag()?;
        self.metadata.create_tag(&tag).await?;
        self.cache.invalidate(Mutation::TagCreated);
        info!(tag_id = %tag.id, name = %tag.name, "Tag created");
        Ok(tag)
    }

    pub async fn update_tag(&self, id: TagId, patch: TagPatch) -> CatalogResult<Tag> {
        let patch = patch.validated()?;
        if patch.is_empty() {
            return self
                .metadata
                .get_tag(id)
                .await?
                .ok_or_else(|| CatalogError::NotFound(format!("tag {id}")));
        }

        let tag = self.metadata.update_tag(id, &patch).await?;
        self.cache.invalidate(Mutation::TagUpdated);
        Ok(tag)
    }

    /// Delete a tag; its associations go with it.
    pub async fn delete_tag(&self, id: TagId) -> CatalogResult<()> {
        self.metadata.delete_tag(id).await?;
        self.index.remove_tag(id);
        self.cache.invalidate(Mutation::TagDeleted);
        info!(tag_id = %id, "Tag deleted");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn ensure_visible(&self, id: AssetId) -> CatalogResult<()> {
        if self.ledger.contains(id) {
            return Err(CatalogError::NotFound(format!(
                "asset {id} is pending deletion"
            )));
        }
        Ok(())
    }

    /// Serve `key` from cache or compute and cache it. Errors are never cached.
    async fn cached<T, F, Fut>(&self, key: CacheKey, compute: F) -> CatalogResult<T>
    where
        T: Cacheable + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CatalogResult<T>>,
    {
        let stamp = self.cache.stamp();
        match self.cache.lookup::<T>(&key) {
            Lookup::Fresh(value) => return Ok(value),
            Lookup::Stale => tracing::debug!(?key, "Cached result invalidated, recomputing"),
            Lookup::Absent => {}
        }

        let value = compute().await?;
        self.cache.store(key, value.clone(), stamp);
        Ok(value)
    }
}
