//! Metadata store trait and implementations.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{AssetRow, AssetTagDetailRow};
use crate::repos::{AssetRepo, TagRepo, TombstoneRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;
use vault_core::{Asset, Tag};

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: AssetRepo + TagRepo + TombstoneRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// Bound on bind parameters per statement, below SQLite's legacy limit of 999.
const BATCH_SIZE: usize = 900;

const ASSET_COLUMNS: &str = "a.asset_id, a.filename, a.blob_key, a.content_type, a.size_bytes, \
     a.width, a.height, a.duration_secs, a.description, a.owner_id, a.created_at, a.updated_at";

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) a SQLite store. `":memory:"` opens a
    /// private in-memory database.
    pub async fn new(path: impl AsRef<Path>, busy_timeout_secs: u64) -> MetadataResult<Self> {
        let path = path.as_ref();
        let busy_timeout = Duration::from_secs(busy_timeout_secs);

        let pool = if path == Path::new(":memory:") {
            let opts = SqliteConnectOptions::from_str("sqlite::memory:")?
                .foreign_keys(true)
                .busy_timeout(busy_timeout);
            // The database lives only as long as its one connection.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(opts)
                .await?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MetadataError::Config(format!(
                        "failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }

            let opts =
                SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
                    .create_if_missing(true)
                    .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                    .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                    .foreign_keys(true)
                    // Prevent transient "database is locked" errors under concurrent access.
                    .busy_timeout(busy_timeout);

            SqlitePoolOptions::new()
                // SQLite permits limited write concurrency; a single connection avoids
                // persistent "database is locked" failures under axum concurrency.
                .max_connections(1)
                .connect_with(opts)
                .await?
        };

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "SQLite metadata store ready");
        Ok(store)
    }

    /// Open a private in-memory store.
    pub async fn in_memory() -> MetadataResult<Self> {
        Self::new(":memory:", 5).await
    }


    /// Load the tag sets of the given assets, each ordered by name.
    async fn tags_by_asset(&self, asset_ids: &[Uuid]) -> MetadataResult<HashMap<Uuid, Vec<Tag>>> {
        let mut result: HashMap<Uuid, Vec<Tag>> = HashMap::with_capacity(asset_ids.len());

        for batch in asset_ids.chunks(BATCH_SIZE) {
            let placeholders: Vec<&str> = batch.iter().map(|_| "?").collect();
            let query = format!(
                "SELECT at.asset_id, t.tag_id, t.name, t.color, t.created_at \
                 FROM asset_tags at JOIN tags t ON t.tag_id = at.tag_id \
                 WHERE at.asset_id IN ({}) ORDER BY t.name, t.tag_id",
                placeholders.join(", ")
            );

            let mut query_builder = sqlx::query_as::<_, AssetTagDetailRow>(&query);
            for id in batch {
                query_builder = query_builder.bind(*id);
            }

            for row in query_builder.fetch_all(&self.pool).await? {
                let (asset_id, tag) = row.into_parts();
                result.entry(asset_id).or_default().push(tag);
            }
        }

        Ok(result)
    }

    /// Attach tag sets to asset rows.
    async fn hydrate(&self, rows: Vec<AssetRow>) -> MetadataResult<Vec<Asset>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.asset_id).collect();
        let mut tags = self.tags_by_asset(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let asset_tags = tags.remove(&row.asset_id).unwrap_or_default();
                row.into_asset(asset_tags)
            })
            .collect()
    }

    /// Rows carrying any of the given tags, each at most once.
    async fn rows_with_any_tag(&self, tag_ids: &[Uuid]) -> MetadataResult<Vec<AssetRow>> {
        let mut rows: HashMap<Uuid, AssetRow> = HashMap::new();

        for batch in tag_ids.chunks(BATCH_SIZE) {
            let placeholders: Vec<&str> = batch.iter().map(|_| "?").collect();
            // EXISTS keeps one row per asset no matter how many tags match.
            let query = format!(
                "SELECT {ASSET_COLUMNS} FROM assets a WHERE EXISTS (\
                 SELECT 1 FROM asset_tags at WHERE at.asset_id = a.asset_id \
                 AND at.tag_id IN ({}))",
                placeholders.join(", ")
            );

            let mut query_builder = sqlx::query_as::<_, AssetRow>(&query);
            for id in batch {
                query_builder = query_builder.bind(*id);
            }

            for row in query_builder.fetch_all(&self.pool).await? {
                rows.insert(row.asset_id, row);
            }
        }

        Ok(rows.into_values().collect())
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::{AssetTagRow, TagRow, TombstoneRow};
    use crate::repos::{AssetFilter, Association};
    use time::OffsetDateTime;
    use vault_core::{AssetId, AssetPatch, NewAsset, TagId, TagPatch};

    fn map_unique_violation(err: sqlx::Error, what: String) -> MetadataError {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                MetadataError::AlreadyExists(what)
            }
            other => other.into(),
        }
    }

    #[async_trait]
    impl AssetRepo for SqliteStore {
        async fn create_asset(&self, asset: &NewAsset) -> MetadataResult<Asset> {
            let size_bytes = i64::try_from(asset.size_bytes).map_err(|_| {
                MetadataError::Constraint(format!("asset size {} too large", asset.size_bytes))
            })?;

            sqlx::query(
                "INSERT INTO assets (asset_id, filename, blob_key, content_type, size_bytes, width, height, duration_secs, description, owner_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(*asset.id.as_uuid())
            .bind(&asset.filename)
            .bind(&asset.blob_key)
            .bind(&asset.content_type)
            .bind(size_bytes)
            .bind(asset.width.map(i64::from))
            .bind(asset.height.map(i64::from))
            .bind(asset.duration_secs)
            .bind(&asset.description)
            .bind(asset.owner_id)
            .bind(asset.created_at)
            .bind(asset.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, format!("asset {}", asset.id)))?;

            Ok(asset.clone().into_asset())
        }

        async fn get_asset(&self, id: AssetId) -> MetadataResult<Option<Asset>> {
            let row: Option<AssetRow> = sqlx::query_as(&format!(
                "SELECT {ASSET_COLUMNS} FROM assets a WHERE a.asset_id = ?"
            ))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

            match row {
                Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
                None => Ok(None),
            }
        }

        async fn update_asset(
            &self,
            id: AssetId,
            patch: &AssetPatch,
            updated_at: OffsetDateTime,
        ) -> MetadataResult<Asset> {
            // UPDATE only touches an existing row, so an edit that loses a race
            // with a delete reports NotFound instead of recreating the asset.
            let result = sqlx::query(
                "UPDATE assets SET filename = COALESCE(?, filename), description = CASE WHEN ? THEN ? ELSE description END, updated_at = ? WHERE asset_id = ?",
            )
            .bind(patch.filename.as_deref())
            .bind(patch.description.is_some())
            .bind(patch.description.as_deref().filter(|d| !d.is_empty()))
            .bind(updated_at)
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("asset {id}")));
            }

            self.get_asset(id)
                .await?
                .ok_or_else(|| MetadataError::NotFound(format!("asset {id}")))
        }

        async fn delete_asset(&self, id: AssetId) -> MetadataResult<()> {
            let result = sqlx::query("DELETE FROM assets WHERE asset_id = ?")
                .bind(*id.as_uuid())
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("asset {id}")));
            }
            Ok(())
        }

        async fn list_assets(&self, filter: &AssetFilter) -> MetadataResult<Vec<Asset>> {
            let rows: Vec<AssetRow> = match &filter.tag_ids {
                Some(tag_ids) if tag_ids.is_empty() => return Ok(Vec::new()),
                Some(tag_ids) => {
                    let ids: Vec<Uuid> = tag_ids.iter().map(|t| *t.as_uuid()).collect();
                    self.rows_with_any_tag(&ids).await?
                }
                None => {
                    sqlx::query_as(&format!("SELECT {ASSET_COLUMNS} FROM assets a"))
                        .fetch_all(&self.pool)
                        .await?
                }
            };

            let mut assets = self.hydrate(rows).await?;

            // SQLite's lower() only folds ASCII; match in Rust for Unicode filenames.
            if let Some(text) = filter.text.as_deref() {
                assets.retain(|asset| vault_core::query::text_matches(text, asset));
            }

            // Timestamps are stored as text; order on the decoded values.
            assets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
            Ok(assets)
        }
    }

    #[async_trait]
    impl TagRepo for SqliteStore {
        async fn create_tag(&self, tag: &Tag) -> MetadataResult<()> {
            sqlx::query("INSERT INTO tags (tag_id, name, color, created_at) VALUES (?, ?, ?, ?)")
                .bind(*tag.id.as_uuid())
                .bind(&tag.name)
                .bind(&tag.color)
                .bind(tag.created_at)
                .execute(&self.pool)
                .await
                .map_err(|e| map_unique_violation(e, format!("tag {}", tag.id)))?;
            Ok(())
        }

        async fn get_tag(&self, id: TagId) -> MetadataResult<Option<Tag>> {
            let row: Option<TagRow> =
                sqlx::query_as("SELECT tag_id, name, color, created_at FROM tags WHERE tag_id = ?")
                    .bind(*id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.map(Tag::from))
        }

        async fn update_tag(&self, id: TagId, patch: &TagPatch) -> MetadataResult<Tag> {
            let result = sqlx::query(
                "UPDATE tags SET name = COALESCE(?, name), color = COALESCE(?, color) WHERE tag_id = ?",
            )
            .bind(patch.name.as_deref())
            .bind(patch.color.as_deref())
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("tag {id}")));
            }

            self.get_tag(id)
                .await?
                .ok_or_else(|| MetadataError::NotFound(format!("tag {id}")))
        }

        async fn delete_tag(&self, id: TagId) -> MetadataResult<()> {
            let result = sqlx::query("DELETE FROM tags WHERE tag_id = ?")
                .bind(*id.as_uuid())
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("tag {id}")));
            }
            Ok(())
        }

        async fn list_tags(&self) -> MetadataResult<Vec<Tag>> {
            let rows: Vec<TagRow> = sqlx::query_as(
                "SELECT tag_id, name, color, created_at FROM tags ORDER BY name, tag_id",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows.into_iter().map(Tag::from).collect())
        }

        async fn set_association(
            &self,
            asset_id: AssetId,
            tag_id: TagId,
            present: bool,
        ) -> MetadataResult<bool> {
            let mut tx = self.pool.begin().await?;

            let asset_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM assets WHERE asset_id = ?)")
                    .bind(*asset_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;
            if !asset_exists {
                return Err(MetadataError::NotFound(format!("asset {asset_id}")));
            }

            let tag_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE tag_id = ?)")
                    .bind(*tag_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;
            if !tag_exists {
                return Err(MetadataError::NotFound(format!("tag {tag_id}")));
            }

            let now = OffsetDateTime::now_utc();
            let result = if present {
                sqlx::query(
                    "INSERT OR IGNORE INTO asset_tags (asset_id, tag_id, created_at) VALUES (?, ?, ?)",
                )
                .bind(*asset_id.as_uuid())
                .bind(*tag_id.as_uuid())
                .bind(now)
                .execute(&mut *tx)
                .await?
            } else {
                sqlx::query("DELETE FROM asset_tags WHERE asset_id = ? AND tag_id = ?")
                    .bind(*asset_id.as_uuid())
                    .bind(*tag_id.as_uuid())
                    .execute(&mut *tx)
                    .await?
            };

            let changed = result.rows_affected() > 0;
            if changed {
                sqlx::query("UPDATE assets SET updated_at = ? WHERE asset_id = ?")
                    .bind(now)
                    .bind(*asset_id.as_uuid())
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;
            Ok(changed)
        }

        async fn tags_for_asset(&self, asset_id: AssetId) -> MetadataResult<Vec<Tag>> {
            let mut tags = self.tags_by_asset(&[*asset_id.as_uuid()]).await?;
            Ok(tags.remove(asset_id.as_uuid()).unwrap_or_default())
        }

        async fn list_associations(&self) -> MetadataResult<Vec<Association>> {
            let rows: Vec<AssetTagRow> =
                sqlx::query_as("SELECT asset_id, tag_id FROM asset_tags")
                    .fetch_all(&self.pool)
                    .await?;
            Ok(rows
                .into_iter()
                .map(|row| Association {
                    asset_id: AssetId::from(row.asset_id),
                    tag_id: TagId::from(row.tag_id),
                })
                .collect())
        }
    }

    #[async_trait]
    impl TombstoneRepo for SqliteStore {
        async fn create_tombstone(
            &self,
            asset_id: AssetId,
            blob_removed_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;

            let asset_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM assets WHERE asset_id = ?)")
                    .bind(*asset_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;
            if !asset_exists {
                return Err(MetadataError::NotFound(format!("asset {asset_id}")));
            }

            sqlx::query(
                "INSERT OR IGNORE INTO asset_tombstones (asset_id, blob_removed_at) VALUES (?, ?)",
            )
            .bind(*asset_id.as_uuid())
            .bind(blob_removed_at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(())
        }

        async fn list_tombstones(&self) -> MetadataResult<Vec<TombstoneRow>> {
            let mut rows: Vec<TombstoneRow> = sqlx::query_as(
                "SELECT t.asset_id, a.blob_key, a.filename, t.blob_removed_at \
                 FROM asset_tombstones t JOIN assets a ON a.asset_id = t.asset_id",
            )
            .fetch_all(&self.pool)
            .await?;

            rows.sort_by(|a, b| {
                a.blob_removed_at
                    .cmp(&b.blob_removed_at)
                    .then(a.asset_id.cmp(&b.asset_id))
            });
            Ok(rows)
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Assets
CREATE TABLE IF NOT EXISTS assets (
    asset_id BLOB PRIMARY KEY,
    filename TEXT NOT NULL,
    blob_key TEXT NOT NULL UNIQUE,
    content_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL CHECK (size_bytes >= 0),
    width INTEGER,
    height INTEGER,
    duration_secs REAL,
    description TEXT,
    owner_id BLOB,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_assets_created ON assets(created_at);

-- Tags (names are not unique)
CREATE TABLE IF NOT EXISTS tags (
    tag_id BLOB PRIMARY KEY,
    name TEXT NOT NULL,
    color TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);

-- Asset <-> tag associations, removed with either side
CREATE TABLE IF NOT EXISTS asset_tags (
    asset_id BLOB NOT NULL REFERENCES assets(asset_id) ON DELETE CASCADE,
    tag_id BLOB NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (asset_id, tag_id)
);
CREATE INDEX IF NOT EXISTS idx_asset_tags_tag ON asset_tags(tag_id);

-- Assets whose blob is gone, removed with the asset
CREATE TABLE IF NOT EXISTS asset_tombstones (
    asset_id BLOB PRIMARY KEY REFERENCES assets(asset_id) ON DELETE CASCADE,
    blob_removed_at TEXT NOT NULL
);
"#;
