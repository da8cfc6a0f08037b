//! Query result cache with mutation-driven invalidation.
//!
//! Invalidation is generation based. Three counters advance on mutations:
//! asset content (including associations), tag membership of the tag list,
//! and tag labels (name/color, which search results embed). Each entry
//! records the counters it was computed under; it is served only while the
//! counters it depends on are unchanged. Callers snapshot the counters
//! *before* reading the store, so a result computed concurrently with a
//! mutation is never stored as fresh.

use crate::metrics;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use vault_core::{Asset, CatalogStats, SearchQuery, Tag};

/// Identity of a cached result.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Search(SearchQuery),
    Tags,
    Stats,
}

impl CacheKey {
    fn depends_on(&self) -> Deps {
        match self {
            CacheKey::Search(q) if q.is_tag_filtered() => Deps {
                assets: true,
                tags: true,
                labels: true,
            },
            CacheKey::Search(_) => Deps {
                assets: true,
                tags: false,
                labels: true,
            },
            CacheKey::Tags => Deps {
                assets: false,
                tags: true,
                labels: true,
            },
            CacheKey::Stats => Deps {
                assets: true,
                tags: true,
                labels: false,
            },
        }
    }
}

#[derive(Clone, Copy)]
struct Deps {
    assets: bool,
    tags: bool,
    labels: bool,
}

/// Snapshot of the invalidation counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stamp {
    assets: u64,
    tags: u64,
    labels: u64,
}

impl Stamp {
    fn still_valid(&self, current: &Stamp, deps: Deps) -> bool {
        (!deps.assets || self.assets == current.assets)
            && (!deps.tags || self.tags == current.tags)
            && (!deps.labels || self.labels == current.labels)
    }
}

/// A completed mutation, named by what changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    AssetCreated,
    AssetEdited,
    AssetDeleted,
    TagAttached,
    TagDetached,
    TagCreated,
    TagUpdated,
    TagDeleted,
}

impl Mutation {
    fn as_str(&self) -> &'static str {
        match self {
            Mutation::AssetCreated => "asset_created",
            Mutation::AssetEdited => "asset_edited",
            Mutation::AssetDeleted => "asset_deleted",
            Mutation::TagAttached => "tag_attached",
            Mutation::TagDetached => "tag_detached",
            Mutation::TagCreated => "tag_created",
            Mutation::TagUpdated => "tag_updated",
            Mutation::TagDeleted => "tag_deleted",
        }
    }
}

/// Cached value payloads.
#[derive(Clone, Debug)]
pub enum CachedValue {
    Assets(Vec<Asset>),
    Tags(Vec<Tag>),
    Stats(CatalogStats),
}

/// Conversion between a typed result and its cache payload.
pub trait Cacheable: Sized {
    fn into_cached(self) -> CachedValue;
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

impl Cacheable for Vec<Asset> {
    fn into_cached(self) -> CachedValue {
        CachedValue::Assets(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Assets(assets) => Some(assets.clone()),
            _ => None,
        }
    }
}

impl Cacheable for Vec<Tag> {
    fn into_cached(self) -> CachedValue {
        CachedValue::Tags(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Tags(tags) => Some(tags.clone()),
            _ => None,
        }
    }
}

impl Cacheable for CatalogStats {
    fn into_cached(self) -> CachedValue {
        CachedValue::Stats(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Stats(stats) => Some(stats.clone()),
            _ => None,
        }
    }
}

/// Outcome of a cache lookup.
#[derive(Debug)]
pub enum Lookup<T> {
    /// Served from cache.
    Fresh(T),
    /// Nothing cached (or caching disabled).
    Absent,
    /// An entry existed but a mutation invalidated it; it has been dropped
    /// and the caller must recompute.
    Stale,
}

struct CacheEntry {
    value: CachedValue,
    stamp: Stamp,
}

/// Tracks cached query results and decides when they must be recomputed.
pub struct CacheCoordinator {
    enabled: bool,
    max_entries: usize,
    entries: DashMap<CacheKey, CacheEntry>,
    asset_gen: AtomicU64,
    tag_gen: AtomicU64,
    label_gen: AtomicU64,
}

impl CacheCoordinator {
    pub fn new(enabled: bool, max_entries: usize) -> Self {
        Self {
            enabled,
            max_entries,
            entries: DashMap::new(),
            asset_gen: AtomicU64::new(0),
            tag_gen: AtomicU64::new(0),
            label_gen: AtomicU64::new(0),
        }
    }

    /// Current counters. Take this before reading the store.
    pub fn stamp(&self) -> Stamp {
        Stamp {
            assets: self.asset_gen.load(Ordering::Acquire),
            tags: self.tag_gen.load(Ordering::Acquire),
            labels: self.label_gen.load(Ordering::Acquire),
        }
    }

    pub fn lookup<T: Cacheable>(&self, key: &CacheKey) -> Lookup<T> {
        if !self.enabled {
            return Lookup::Absent;
        }

        let current = self.stamp();
        let outcome = match self.entries.get(key) {
            None => Lookup::Absent,
            Some(entry) if entry.stamp.still_valid(&current, key.depends_on()) => {
                match T::from_cached(&entry.value) {
                    Some(value) => Lookup::Fresh(value),
                    None => Lookup::Absent,
                }
            }
            Some(_) => Lookup::Stale,
        };

        match &outcome {
            Lookup::Fresh(_) => metrics::CACHE_LOOKUPS.with_label_values(&["hit"]).inc(),
            Lookup::Absent => metrics::CACHE_LOOKUPS.with_label_values(&["miss"]).inc(),
            Lookup::Stale => {
                metrics::CACHE_LOOKUPS.with_label_values(&["stale"]).inc();
                // Drop the entry only if no newer result replaced it meanwhile.
                self.entries
                    .remove_if(key, |_, e| !e.stamp.still_valid(&current, key.depends_on()));
            }
        }
        outcome
    }

    /// Store a result computed under `stamp`.
    ///
    /// Ignored if a relevant mutation happened since `stamp` was taken, or
    /// if the cache is full of valid entries.
    pub fn store<T: Cacheable>(&self, key: CacheKey, value: T, stamp: Stamp) {
        if !self.enabled {
            return;
        }

        let current = self.stamp();
        let deps = key.depends_on();
        if !stamp.still_valid(&current, deps) {
            tracing::debug!(?key, "discarding result computed across a mutation");
            return;
        }

        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.entries
                .retain(|k, e| e.stamp.still_valid(&current, k.depends_on()));
            if self.entries.len() >= self.max_entries {
                tracing::debug!(
                    entries = self.entries.len(),
                    "result cache full, not caching"
                );
                return;
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                value: value.into_cached(),
                stamp,
            },
        );
    }

    /// Record a completed mutation.
    pub fn invalidate(&self, mutation: Mutation) {
        match mutation {
            Mutation::AssetCreated
            | Mutation::AssetEdited
            | Mutation::AssetDeleted
            | Mutation::TagAttached
            | Mutation::TagDetached => {
                self.asset_gen.fetch_add(1, Ordering::AcqRel);
            }
            Mutation::TagCreated => {
                self.tag_gen.fetch_add(1, Ordering::AcqRel);
            }
            Mutation::TagUpdated => {
                self.label_gen.fetch_add(1, Ordering::AcqRel);
            }
            Mutation::TagDeleted => {
                self.tag_gen.fetch_add(1, Ordering::AcqRel);
                self.label_gen.fetch_add(1, Ordering::AcqRel);
            }
        }
        metrics::CACHE_INVALIDATIONS
            .with_label_values(&[mutation.as_str()])
            .inc();
    }

    /// Number of stored entries, valid or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
