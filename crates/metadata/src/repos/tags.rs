//! Tag and association repository trait.

use crate::error::MetadataResult;
use async_trait::async_trait;
use vault_core::{AssetId, Tag, TagId, TagPatch};

/// One asset-tag membership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Association {
    pub asset_id: AssetId,
    pub tag_id: TagId,
}

/// Repository for tags and asset-tag associations.
#[async_trait]
pub trait TagRepo: Send + Sync {
    /// Create a tag.
    async fn create_tag(&self, tag: &Tag) -> MetadataResult<()>;

    /// Get a tag by ID.
    async fn get_tag(&self, id: TagId) -> MetadataResult<Option<Tag>>;

    /// Rename and/or recolor a tag. Returns `NotFound` if absent.
    async fn update_tag(&self, id: TagId, patch: &TagPatch) -> MetadataResult<Tag>;

    /// Delete a tag; associations cascade. Returns `NotFound` if absent.
    async fn delete_tag(&self, id: TagId) -> MetadataResult<()>;

    /// List all tags ordered by name.
    async fn list_tags(&self) -> MetadataResult<Vec<Tag>>;

    /// Attach (`present = true`) or detach a tag.
    ///
    /// Idempotent on the pair. Returns whether the association changed, or
    /// `NotFound` if the asset or the tag does not exist.
    async fn set_association(
        &self,
        asset_id: AssetId,
        tag_id: TagId,
        present: bool,
    ) -> MetadataResult<bool>;

    /// Tags attached to one asset, ordered by name.
    async fn tags_for_asset(&self, asset_id: AssetId) -> MetadataResult<Vec<Tag>>;

    /// Every association in the store.
    async fn list_associations(&self) -> MetadataResult<Vec<Association>>;
}
