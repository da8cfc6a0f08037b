//! Shared helpers for metadata store tests.

use time::{Duration, OffsetDateTime};
use vault_core::{Asset, NewAsset, NewTag, Tag};
use vault_metadata::{AssetRepo, SqliteStore, TagRepo};

/// Fresh in-memory store.
pub async fn store() -> SqliteStore {
    SqliteStore::in_memory().await.unwrap()
}

/// Insert an asset created `age_secs` seconds ago.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub async fn insert_asset(
    store: &SqliteStore,
    filename: &str,
    description: Option<&str>,
    age_secs: i64,
) -> Asset {
    let mut new = NewAsset::from_upload(filename, "image/png", 128).unwrap();
    new.description = description.map(str::to_string);
    new.created_at = OffsetDateTime::now_utc() - Duration::seconds(age_secs);
    store.create_asset(&new).await.unwrap()
}

#[allow(dead_code)]
pub async fn insert_tag(store: &SqliteStore, name: &str) -> Tag {
    let tag = NewTag {
        name: name.to_string(),
        color: None,
    }
    .into_tag()
    .unwrap();
    store.create_tag(&tag).await.unwrap();
    tag
}
