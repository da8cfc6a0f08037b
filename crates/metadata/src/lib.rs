//! Metadata store abstraction and implementations for the asset vault.
//!
//! This crate provides the authoritative record store:
//! - Asset records with filtered, ordered listings
//! - Tags and asset-tag associations with cascading deletes
//! - Tombstones for assets whose blob is already gone
//! - A SQLite adapter

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::TombstoneRow;
pub use repos::{AssetFilter, AssetRepo, Association, TagRepo, TombstoneRepo};
pub use store::{MetadataStore, SqliteStore};

use std::sync::Arc;
use vault_core::config::MetadataConfig;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    config.validate().map_err(MetadataError::Config)?;

    match config {
        MetadataConfig::Sqlite {
            path,
            busy_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *busy_timeout_secs).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
