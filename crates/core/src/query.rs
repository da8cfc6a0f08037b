//! Combined text + tag search query.

use crate::asset::Asset;
use crate::tag::TagId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A search request over the asset catalog.
///
/// `tag_ids == None` means no tag filter is applied. `Some(empty)` is an
/// applied filter that selects nothing and therefore matches no asset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    text: Option<String>,
    tag_ids: Option<BTreeSet<TagId>>,
}

impl SearchQuery {
    /// Query matching every asset.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a query. Empty text is treated as absent.
    pub fn new<I>(text: Option<&str>, tag_ids: Option<I>) -> Self
    where
        I: IntoIterator<Item = TagId>,
    {
        Self {
            text: normalize_text(text),
            tag_ids: tag_ids.map(|ids| ids.into_iter().collect()),
        }
    }

    /// Set the free-text predicate.
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = normalize_text(Some(text));
        self
    }

    /// Apply a tag filter (union semantics).
    pub fn with_tags<I>(mut self, tag_ids: I) -> Self
    where
        I: IntoIterator<Item = TagId>,
    {
        self.tag_ids = Some(tag_ids.into_iter().collect());
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn tag_ids(&self) -> Option<&BTreeSet<TagId>> {
        self.tag_ids.as_ref()
    }

    /// Whether a tag filter (possibly empty) is applied.
    pub fn is_tag_filtered(&self) -> bool {
        self.tag_ids.is_some()
    }

    /// Whether the query is guaranteed to match nothing.
    pub fn selects_nothing(&self) -> bool {
        self.tag_ids.as_ref().is_some_and(|ids| ids.is_empty())
    }
}

// Only the empty string means "no text"; whitespace is searched as typed.
fn normalize_text(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.is_empty()).map(str::to_string)
}

/// Case-insensitive substring test over an asset's filename and description.
pub fn text_matches(needle: &str, asset: &Asset) -> bool {
    let needle = needle.to_lowercase();
    asset.filename.to_lowercase().contains(&needle)
        || asset
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
}
