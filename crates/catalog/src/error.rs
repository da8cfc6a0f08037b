//! Catalog error types.

use thiserror::Error;
use vault_core::AssetId;
use vault_metadata::MetadataError;
use vault_storage::StorageError;

/// Errors surfaced to catalog callers.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The referenced asset or tag does not exist (or is hidden pending deletion).
    #[error("not found: {0}")]
    NotFound(String),

    /// A request field failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transient failure of the metadata or blob store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The blob was removed but the metadata record could not be.
    #[error("orphaned metadata for asset {asset_id}: {message}")]
    OrphanedMetadata { asset_id: AssetId, message: String },
}

/// Stable classification of a [`CatalogError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    StoreUnavailable,
    OrphanedMetadata,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::OrphanedMetadata => "orphaned_metadata",
        }
    }
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NotFound(_) => ErrorKind::NotFound,
            CatalogError::Validation(_) => ErrorKind::Validation,
            CatalogError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            CatalogError::OrphanedMetadata { .. } => ErrorKind::OrphanedMetadata,
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::StoreUnavailable | ErrorKind::OrphanedMetadata
        )
    }
}

impl From<MetadataError> for CatalogError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(what) => CatalogError::NotFound(what),
            MetadataError::AlreadyExists(what) => {
                CatalogError::Validation(format!("already exists: {what}"))
            }
            MetadataError::Constraint(msg) => CatalogError::Validation(msg),
            other => CatalogError::StoreUnavailable(format!("metadata store: {other}")),
        }
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => CatalogError::NotFound(format!("blob {key}")),
            StorageError::InvalidKey(msg) => CatalogError::Validation(msg),
            other => CatalogError::StoreUnavailable(format!("blob store: {other}")),
        }
    }
}

impl From<vault_core::Error> for CatalogError {
    fn from(err: vault_core::Error) -> Self {
        match err {
            vault_core::Error::Validation(msg) | vault_core::Error::InvalidId(msg) => {
                CatalogError::Validation(msg)
            }
        }
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
