//! Tombstone repository trait for half-deleted assets.

use crate::error::MetadataResult;
use crate::models::TombstoneRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use vault_core::AssetId;

/// Repository for blob-removed markers.
///
/// A tombstone lives exactly as long as its asset record: deleting the
/// asset removes it.
#[async_trait]
pub trait TombstoneRepo: Send + Sync {
    /// Record that the asset's blob is gone.
    ///
    /// Idempotent; the first timestamp wins. Returns `NotFound` if the asset
    /// record does not exist.
    async fn create_tombstone(
        &self,
        asset_id: AssetId,
        blob_removed_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// All tombstones, oldest first.
    async fn list_tombstones(&self) -> MetadataResult<Vec<TombstoneRow>>;
}
