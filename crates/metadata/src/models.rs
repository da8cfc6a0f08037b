//! Database models mapping to the metadata schema.

use crate::error::{MetadataError, MetadataResult};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;
use vault_core::{Asset, AssetId, Tag, TagId};

// =============================================================================
// Assets
// =============================================================================

/// Asset record, without its tag set.
#[derive(Debug, Clone, FromRow)]
pub struct AssetRow {
    pub asset_id: Uuid,
    pub filename: String,
    pub blob_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration_secs: Option<f64>,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl AssetRow {
    /// Convert to the domain record with the given tag set attached.
    pub fn into_asset(self, tags: Vec<Tag>) -> MetadataResult<Asset> {
        Ok(Asset {
            id: AssetId::from(self.asset_id),
            size_bytes: u64::try_from(self.size_bytes).map_err(|_| {
                MetadataError::Internal(format!(
                    "negative size_bytes for asset {}",
                    self.asset_id
                ))
            })?,
            width: dimension(self.width, "width", self.asset_id)?,
            height: dimension(self.height, "height", self.asset_id)?,
            filename: self.filename,
            blob_key: self.blob_key,
            content_type: self.content_type,
            duration_secs: self.duration_secs,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
            owner_id: self.owner_id,
            tags,
        })
    }
}

fn dimension(value: Option<i64>, field: &str, asset_id: Uuid) -> MetadataResult<Option<u32>> {
    value
        .map(|v| {
            u32::try_from(v).map_err(|_| {
                MetadataError::Internal(format!("{field} out of range for asset {asset_id}"))
            })
        })
        .transpose()
}

// =============================================================================
// Tags
// =============================================================================

/// Tag record.
#[derive(Debug, Clone, FromRow)]
pub struct TagRow {
    pub tag_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: OffsetDateTime,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: TagId::from(row.tag_id),
            name: row.name,
            color: row.color,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Associations
// =============================================================================

/// Bare association pair, used to warm in-process indexes.
#[derive(Debug, Clone, FromRow)]
pub struct AssetTagRow {
    pub asset_id: Uuid,
    pub tag_id: Uuid,
}

/// Association joined with the tag's attributes.
#[derive(Debug, Clone, FromRow)]
pub struct AssetTagDetailRow {
    pub asset_id: Uuid,
    pub tag_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: OffsetDateTime,
}

impl AssetTagDetailRow {
    /// Split into the owning asset id and the tag.
    pub fn into_parts(self) -> (Uuid, Tag) {
        (
            self.asset_id,
            Tag {
                id: TagId::from(self.tag_id),
                name: self.name,
                color: self.color,
                created_at: self.created_at,
            },
        )
    }
}

// =============================================================================
// Tombstones
// =============================================================================

/// An asset whose blob has been removed while its record remains.
#[derive(Debug, Clone, FromRow)]
pub struct TombstoneRow {
    pub asset_id: Uuid,
    pub blob_key: String,
    pub filename: String,
    pub blob_removed_at: OffsetDateTime,
}
