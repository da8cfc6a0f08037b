//! Core domain types and shared logic for the asset vault.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Asset and tag identifiers and records
//! - Field validation for uploads, edits and tag management
//! - The combined text + tag search query
//! - Catalog statistics
//! - Configuration types

pub mod asset;
pub mod config;
pub mod error;
pub mod query;
pub mod stats;
pub mod tag;

pub use asset::{Asset, AssetId, AssetPatch, ContentKind, NewAsset, blob_key_for};
pub use error::{Error, Result};
pub use query::SearchQuery;
pub use stats::CatalogStats;
pub use tag::{DEFAULT_TAG_COLOR, NewTag, Tag, TagId, TagPatch};

/// Maximum length of an asset filename, in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

/// Maximum length of a tag name, in bytes.
pub const MAX_TAG_NAME_LEN: usize = 64;

/// Maximum length of a tag color value, in bytes.
pub const MAX_TAG_COLOR_LEN: usize = 32;
