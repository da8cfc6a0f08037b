//! Asset repository trait.

use crate::error::MetadataResult;
use async_trait::async_trait;
use time::OffsetDateTime;
use vault_core::{Asset, AssetId, AssetPatch, NewAsset, SearchQuery, TagId};

/// Filter for asset listings.
///
/// `tag_ids == None` applies no tag filter; `Some(empty)` matches nothing.
/// A tag filter selects assets carrying any of the listed tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetFilter {
    pub text: Option<String>,
    pub tag_ids: Option<Vec<TagId>>,
}

impl AssetFilter {
    /// Every asset.
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the text predicate of a search query.
    pub fn text_only(query: &SearchQuery) -> Self {
        Self {
            text: query.text().map(str::to_string),
            tag_ids: None,
        }
    }

    /// Both predicates of a search query.
    pub fn from_query(query: &SearchQuery) -> Self {
        Self {
            text: query.text().map(str::to_string),
            tag_ids: query.tag_ids().map(|ids| ids.iter().copied().collect()),
        }
    }
}

/// Repository for asset records.
#[async_trait]
pub trait AssetRepo: Send + Sync {
    /// Create an asset record.
    ///
    /// Returns `AlreadyExists` if the id or blob key is taken.
    async fn create_asset(&self, asset: &NewAsset) -> MetadataResult<Asset>;

    /// Get an asset with its tags attached.
    async fn get_asset(&self, id: AssetId) -> MetadataResult<Option<Asset>>;

    /// Apply an edit to an existing asset.
    ///
    /// Returns `NotFound` if the row does not exist. Never inserts.
    async fn update_asset(
        &self,
        id: AssetId,
        patch: &AssetPatch,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<Asset>;

    /// Delete an asset; associations cascade.
    ///
    /// Returns `NotFound` if the row does not exist.
    async fn delete_asset(&self, id: AssetId) -> MetadataResult<()>;

    /// List assets matching a filter, newest first, ties by id ascending.
    async fn list_assets(&self, filter: &AssetFilter) -> MetadataResult<Vec<Asset>>;
}
