//! In-process tag membership index.
//!
//! Maps each tag to the assets carrying it (and back) so tag filters resolve
//! as set-membership tests. The index is derived state: the metadata store
//! is authoritative and every full read through it resyncs the entries it
//! covers.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use vault_core::{Asset, AssetId, TagId};
use vault_metadata::Association;

#[derive(Default)]
struct IndexState {
    warm: bool,
    members: HashMap<TagId, HashSet<AssetId>>,
    tags_of: HashMap<AssetId, HashSet<TagId>>,
}

impl IndexState {
    fn insert(&mut self, asset_id: AssetId, tag_id: TagId) -> bool {
        let added = self.members.entry(tag_id).or_default().insert(asset_id);
        self.tags_of.entry(asset_id).or_default().insert(tag_id);
        added
    }

    fn remove(&mut self, asset_id: AssetId, tag_id: TagId) -> bool {
        let removed = match self.members.get_mut(&tag_id) {
            Some(assets) => {
                let removed = assets.remove(&asset_id);
                if assets.is_empty() {
                    self.members.remove(&tag_id);
                }
                removed
            }
            None => false,
        };
        if let Some(tags) = self.tags_of.get_mut(&asset_id) {
            tags.remove(&tag_id);
            if tags.is_empty() {
                self.tags_of.remove(&asset_id);
            }
        }
        removed
    }
}

/// Tag to asset membership index.
///
/// Starts cold; [`TagIndex::rebuild`] warms it. While cold, callers must not
/// rely on [`TagIndex::members_of`] and should filter in the store instead.
#[derive(Default)]
pub struct TagIndex {
    state: RwLock<IndexState>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the index has been loaded from the store.
    pub fn is_warm(&self) -> bool {
        self.read(|s| s.warm)
    }

    /// Replace the whole index with the given associations.
    pub fn rebuild<I>(&self, associations: I)
    where
        I: IntoIterator<Item = Association>,
    {
        let mut fresh = IndexState {
            warm: true,
            ..IndexState::default()
        };
        for assoc in associations {
            fresh.insert(assoc.asset_id, assoc.tag_id);
        }
        self.write(|s| *s = fresh);
    }

    /// Replace the whole index from a full asset listing.
    pub fn rebuild_from_assets(&self, assets: &[Asset]) {
        self.rebuild(assets.iter().flat_map(|asset| {
            asset.tags.iter().map(move |tag| Association {
                asset_id: asset.id,
                tag_id: tag.id,
            })
        }));
    }

    /// Union of the assets carrying any of `tag_ids`.
    ///
    /// An empty selection yields the empty set, never "all assets".
    pub fn members_of(&self, tag_ids: &BTreeSet<TagId>) -> HashSet<AssetId> {
        self.read(|s| {
            tag_ids
                .iter()
                .filter_map(|tag_id| s.members.get(tag_id))
                .flatten()
                .copied()
                .collect()
        })
    }

    /// Reflect one association change. Idempotent.
    pub fn update(&self, asset_id: AssetId, tag_id: TagId, added: bool) {
        self.write(|s| {
            if added {
                s.insert(asset_id, tag_id);
            } else {
                s.remove(asset_id, tag_id);
            }
        });
    }

    /// Forget an asset (its associations cascaded away).
    pub fn remove_asset(&self, asset_id: AssetId) {
        self.write(|s| {
            if let Some(tags) = s.tags_of.remove(&asset_id) {
                for tag_id in tags {
                    if let Some(assets) = s.members.get_mut(&tag_id) {
                        assets.remove(&asset_id);
                        if assets.is_empty() {
                            s.members.remove(&tag_id);
                        }
                    }
                }
            }
        });
    }

    /// Forget a tag (its associations cascaded away).
    pub fn remove_tag(&self, tag_id: TagId) {
        self.write(|s| {
            if let Some(assets) = s.members.remove(&tag_id) {
                for asset_id in assets {
                    if let Some(tags) = s.tags_of.get_mut(&asset_id) {
                        tags.remove(&tag_id);
                        if tags.is_empty() {
                            s.tags_of.remove(&asset_id);
                        }
                    }
                }
            }
        });
    }

    /// Make one asset's entry match the store. Returns whether it differed.
    pub fn resync_asset(&self, asset: &Asset) -> bool {
        let actual: HashSet<TagId> = asset.tags.iter().map(|t| t.id).collect();
        self.write(|s| {
            let indexed = s.tags_of.get(&asset.id).cloned().unwrap_or_default();
            if indexed == actual {
                return false;
            }
            for stale in indexed.difference(&actual) {
                s.remove(asset.id, *stale);
            }
            for missing in actual.difference(&indexed) {
                s.insert(asset.id, *missing);
            }
            true
        })
    }

    /// Number of indexed associations.
    pub fn len(&self) -> usize {
        self.read(|s| s.tags_of.values().map(HashSet::len).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Each accessor holds the lock for one closure, so no caller ever sees a
    // half-applied change.
    fn read<R>(&self, f: impl FnOnce(&IndexState) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut IndexState) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
