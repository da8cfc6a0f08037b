//! Combined text + tag search.
//!
//! The text predicate runs in the metadata store; the tag predicate is a
//! membership test against the [`TagIndex`]. Results are deduplicated and
//! ordered explicitly rather than relying on the shape of the store query.

use crate::deletion::OrphanLedger;
use crate::error::CatalogResult;
use crate::metrics;
use crate::tag_index::TagIndex;
use std::collections::HashSet;
use std::sync::Arc;
use vault_core::{Asset, SearchQuery};
use vault_metadata::{AssetFilter, MetadataStore};

/// Resolves a [`SearchQuery`] into an ordered, duplicate-free asset list.
pub struct SearchQueryPlanner {
    metadata: Arc<dyn MetadataStore>,
    index: Arc<TagIndex>,
    ledger: Arc<OrphanLedger>,
}

impl SearchQueryPlanner {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        index: Arc<TagIndex>,
        ledger: Arc<OrphanLedger>,
    ) -> Self {
        Self {
            metadata,
            index,
            ledger,
        }
    }

    /// Run a search against the authoritative store.
    pub async fn execute(&self, query: &SearchQuery) -> CatalogResult<Vec<Asset>> {
        if query.selects_nothing() {
            return Ok(Vec::new());
        }

        let assets = if self.index.is_warm() || !query.is_tag_filtered() {
            let fetched = self
                .metadata
                .list_assets(&AssetFilter::text_only(query))
                .await?;
            self.resync_index(query, &fetched);

            match query.tag_ids() {
                Some(tag_ids) => {
                    let members = self.index.members_of(tag_ids);
                    fetched
                        .into_iter()
                        .filter(|asset| members.contains(&asset.id))
                        .collect()
                }
                None => fetched,
            }
        } else {
            tracing::debug!("Tag index cold, filtering tags in the metadata store");
            self.metadata
                .list_assets(&AssetFilter::from_query(query))
                .await?
        };

        Ok(finalize(assets, |asset| !self.ledger.contains(asset.id)))
    }

    /// Bring the index in line with the tag sets the store just returned.
    fn resync_index(&self, query: &SearchQuery, fetched: &[Asset]) {
        if query.text().is_none() {
            // A full listing covers every association.
            if !self.index.is_warm() {
                tracing::info!(
                    assets = fetched.len(),
                    "Warming tag index from full listing"
                );
            }
            self.index.rebuild_from_assets(fetched);
            return;
        }

        if !self.index.is_warm() {
            return;
        }
        let corrected = fetched
            .iter()
            .filter(|asset| self.index.resync_asset(asset))
            .count();
        if corrected > 0 {
            tracing::debug!(corrected, "Resynced stale tag index entries");
            metrics::INDEX_RESYNCS.inc_by(corrected as u64);
        }
    }
}

/// Drop excluded and duplicate assets, then order by creation time
/// descending with ties broken by id ascending.
pub fn finalize<F>(assets: Vec<Asset>, keep: F) -> Vec<Asset>
where
    F: Fn(&Asset) -> bool,
{
    let mut seen = HashSet::with_capacity(assets.len());
    let mut result: Vec<Asset> = assets
        .into_iter()
        .filter(|asset| keep(asset) && seen.insert(asset.id))
        .collect();
    result.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    result
}
