//! Application state shared across handlers.

use std::sync::Arc;
use vault_catalog::Catalog;
use vault_core::config::AppConfig;
use vault_metadata::MetadataStore;
use vault_storage::BlobStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The asset catalog.
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Open the catalog over the given stores.
    pub async fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let catalog = Catalog::open(metadata, blobs, &config.catalog).await;
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
        }
    }
}
