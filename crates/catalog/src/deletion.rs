//! Two-step asset deletion: blob first, then metadata.
//!
//! The stores cannot be updated atomically together, so each deletion walks
//! an explicit state machine:
//!
//! ```text
//! Pending --blob delete ok--> BlobRemoved --metadata delete ok--> MetadataRemoved
//!    |                             |
//!    +--blob delete failed--> Failed   +--metadata delete failed--> Failed (orphaned)
//! ```
//!
//! A blob failure leaves the asset intact. A metadata failure after the blob
//! is gone is reported as `OrphanedMetadata`; the asset is recorded in the
//! [`OrphanLedger`], hidden from reads, and a retry performs only the
//! metadata step. The blob step also leaves a tombstone in the metadata
//! store so a restarted process can rebuild the ledger.

use crate::cache::{CacheCoordinator, Mutation};
use crate::error::{CatalogError, CatalogResult};
use crate::metrics;
use crate::tag_index::TagIndex;
use dashmap::DashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};
use vault_core::{Asset, AssetId};
use vault_metadata::{MetadataStore, TombstoneRow};
use vault_storage::BlobStore;

/// Progress of one deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeletionState {
    Pending,
    BlobRemoved,
    MetadataRemoved,
    Failed,
}

impl DeletionState {
    /// Lowercase state name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionState::Pending => "pending",
            DeletionState::BlobRemoved => "blob_removed",
            DeletionState::MetadataRemoved => "metadata_removed",
            DeletionState::Failed => "failed",
        }
    }
}

/// Outcome of a successful deletion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionReport {
    pub asset_id: AssetId,
    pub blob_key: String,
    /// Always `MetadataRemoved` for a returned report.
    pub state: DeletionState,
    /// The blob was already gone when the blob step ran.
    pub blob_already_absent: bool,
    /// This call resumed an earlier deletion and skipped the blob step.
    pub resumed: bool,
}

/// An asset whose blob is removed but whose metadata still exists.
#[derive(Clone, Debug, PartialEq)]
pub struct OrphanRecord {
    pub asset_id: AssetId,
    pub blob_key: String,
    pub filename: String,
    pub orphaned_at: OffsetDateTime,
    pub last_error: String,
    pub attempts: u32,
}

/// In-process view of deletions that reached `BlobRemoved`.
///
/// Rebuilt from metadata tombstones when the catalog opens. A deletion whose
/// tombstone write failed is tracked only here until it is retried.
#[derive(Default)]
pub struct OrphanLedger {
    entries: DashMap<AssetId, OrphanRecord>,
}

impl OrphanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: AssetId) -> Option<OrphanRecord> {
        self.entries.get(&id).map(|e| e.value().clone())
    }

    /// All records, oldest first.
    pub fn list(&self) -> Vec<OrphanRecord> {
        let mut records: Vec<OrphanRecord> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| {
            a.orphaned_at
                .cmp(&b.orphaned_at)
                .then(a.asset_id.cmp(&b.asset_id))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adopt a tombstone left by an earlier process.
    pub(crate) fn restore(&self, tombstone: TombstoneRow) {
        let asset_id = AssetId::from(tombstone.asset_id);
        self.entries.entry(asset_id).or_insert_with(|| OrphanRecord {
            asset_id,
            blob_key: tombstone.blob_key,
            filename: tombstone.filename,
            orphaned_at: tombstone.blob_removed_at,
            last_error: String::new(),
            attempts: 0,
        });
        metrics::ORPHANED_ASSETS.set(self.entries.len() as i64);
    }

    /// Returns the time the blob removal was first recorded.
    fn mark_blob_removed(&self, asset: &Asset) -> OffsetDateTime {
        let orphaned_at = self
            .entries
            .entry(asset.id)
            .or_insert_with(|| OrphanRecord {
                asset_id: asset.id,
                blob_key: asset.blob_key.clone(),
                filename: asset.filename.clone(),
                orphaned_at: OffsetDateTime::now_utc(),
                last_error: String::new(),
                attempts: 0,
            })
            .orphaned_at;
        metrics::ORPHANED_ASSETS.set(self.entries.len() as i64);
        orphaned_at
    }

    fn record_failure(&self, id: AssetId, error: &str) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.attempts += 1;
            entry.last_error = error.to_string();
        }
    }

    fn clear(&self, id: AssetId) {
        self.entries.remove(&id);
        metrics::ORPHANED_ASSETS.set(self.entries.len() as i64);
    }
}

/// Orchestrates blob + metadata removal.
///
/// Derived state (tag index, cached results) is updated by the pipeline run
/// itself once the stores confirm an outcome, so it stays correct even when
/// the caller has stopped waiting.
pub struct DeletionPipeline {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    ledger: Arc<OrphanLedger>,
    index: Arc<TagIndex>,
    cache: Arc<CacheCoordinator>,
}

impl DeletionPipeline {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        ledger: Arc<OrphanLedger>,
        index: Arc<TagIndex>,
        cache: Arc<CacheCoordinator>,
    ) -> Self {
        Self {
            metadata,
            blobs,
            ledger,
            index,
            cache,
        }
    }

    /// Delete an asset.
    ///
    /// Returns `NotFound` if the asset does not exist. Once the blob step has
    /// started the pipeline runs on its own task: dropping the returned
    /// future does not stop it.
    pub async fn delete(&self, id: AssetId) -> CatalogResult<DeletionReport> {
        let run = PipelineRun {
            metadata: self.metadata.clone(),
            blobs: self.blobs.clone(),
            ledger: self.ledger.clone(),
            index: self.index.clone(),
            cache: self.cache.clone(),
        };

        let task = match self.ledger.get(id) {
            Some(record) => tokio::spawn(run.from_blob_removed(record)),
            None => {
                let asset = self
                    .metadata
                    .get_asset(id)
                    .await?
                    .ok_or_else(|| CatalogError::NotFound(format!("asset {id}")))?;
                tokio::spawn(run.from_pending(asset))
            }
        };

        task.await.map_err(|e| {
            CatalogError::StoreUnavailable(format!("deletion task for asset {id} aborted: {e}"))
        })?
    }
}

/// Owned handles for one spawned pipeline run.
struct PipelineRun {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    ledger: Arc<OrphanLedger>,
    index: Arc<TagIndex>,
    cache: Arc<CacheCoordinator>,
}

impl PipelineRun {
    async fn from_pending(self, asset: Asset) -> CatalogResult<DeletionReport> {
        let blob_already_absent = match self.blobs.delete(&asset.blob_key).await {
            Ok(()) => false,
            Err(e) if e.is_not_found() => {
                warn!(asset_id = %asset.id, blob_key = %asset.blob_key, "Blob already absent, continuing deletion");
                true
            }
            Err(e) => {
                warn!(
                    asset_id = %asset.id,
                    state = DeletionState::Failed.as_str(),
                    error = %e,
                    "Blob delete failed; asset left intact"
                );
                metrics::record_deletion("blob_failed");
                return Err(e.into());
            }
        };

        let orphaned_at = self.ledger.mark_blob_removed(&asset);
        // Hidden from reads from here on.
        self.cache.invalidate(Mutation::AssetDeleted);
        match self.metadata.create_tombstone(asset.id, orphaned_at).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(asset_id = %asset.id, error = %e, "Failed to persist blob-removed tombstone");
            }
        }
        tracing::debug!(
            asset_id = %asset.id,
            state = DeletionState::BlobRemoved.as_str(),
            "Blob step complete"
        );

        let mut report = self.metadata_step(asset.id, &asset.blob_key).await?;
        report.blob_already_absent = blob_already_absent;
        Ok(report)
    }

    async fn from_blob_removed(self, record: OrphanRecord) -> CatalogResult<DeletionReport> {
        info!(
            asset_id = %record.asset_id,
            attempts = record.attempts,
            "Resuming deletion at the metadata step"
        );
        let mut report = self
            .metadata_step(record.asset_id, &record.blob_key)
            .await?;
        report.resumed = true;
        metrics::record_deletion("resumed");
        Ok(report)
    }

    async fn metadata_step(&self, id: AssetId, blob_key: &str) -> CatalogResult<DeletionReport> {
        match self.metadata.delete_asset(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(asset_id = %id, "Metadata already removed");
            }
            Err(e) => {
                let message = e.to_string();
                self.ledger.record_failure(id, &message);
                warn!(
                    asset_id = %id,
                    state = DeletionState::Failed.as_str(),
                    error = %message,
                    "Metadata delete failed after blob removal; asset is orphaned"
                );
                metrics::record_deletion("orphaned");
                return Err(CatalogError::OrphanedMetadata {
                    asset_id: id,
                    message,
                });
            }
        }

        self.index.remove_asset(id);
        self.ledger.clear(id);
        self.cache.invalidate(Mutation::AssetDeleted);
        metrics::record_deletion("deleted");
        info!(asset_id = %id, state = DeletionState::MetadataRemoved.as_str(), "Asset deleted");
        Ok(DeletionReport {
            asset_id: id,
            blob_key: blob_key.to_string(),
            state: DeletionState::MetadataRemoved,
            blob_already_absent: false,
            resumed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_core::NewAsset;

    fn asset() -> Asset {
        NewAsset::from_upload("x.png", "image/png", 1)
            .unwrap()
            .into_asset()
    }

    #[test]
    fn test_ledger_tracks_orphans() {
        let ledger = OrphanLedger::new();
        let a = asset();
        ledger.mark_blob_removed(&a);
        ledger.mark_blob_removed(&a);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(a.id));

        ledger.record_failure(a.id, "database is locked");
        let record = ledger.get(a.id).unwrap();
        assert_eq!(record.attempts, 1);
        assert_eq!(record.last_error, "database is locked");
        assert_eq!(record.blob_key, a.blob_key);

        ledger.clear(a.id);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_ledger_lists_oldest_first() {
        let ledger = OrphanLedger::new();
        let first = asset();
        let second = asset();
        ledger.mark_blob_removed(&first);
        ledger.mark_blob_removed(&second);
        if let Some(mut e) = ledger.entries.get_mut(&second.id) {
            e.orphaned_at = e.orphaned_at - time::Duration::seconds(60);
        }
        let ids: Vec<AssetId> = ledger.list().into_iter().map(|r| r.asset_id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_ledger_restores_tombstone() {
        let ledger = OrphanLedger::new();
        let a = asset();
        let removed_at = OffsetDateTime::now_utc() - time::Duration::seconds(300);
        ledger.restore(TombstoneRow {
            asset_id: *a.id.as_uuid(),
            blob_key: a.blob_key.clone(),
            filename: a.filename.clone(),
            blob_removed_at: removed_at,
        });

        let record = ledger.get(a.id).unwrap();
        assert_eq!(record.blob_key, a.blob_key);
        assert_eq!(record.orphaned_at, removed_at);
        assert_eq!(record.attempts, 0);
        assert_eq!(ledger.mark_blob_removed(&a), removed_at);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(DeletionState::BlobRemoved.as_str(), "blob_removed");
        assert_eq!(DeletionState::MetadataRemoved.as_str(), "metadata_removed");
    }
}
