//! Operator endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use time::OffsetDateTime;
use vault_catalog::OrphanRecord;
use vault_core::AssetId;

/// An asset whose blob is gone but whose record could not be removed.
#[derive(Debug, Serialize)]
pub struct OrphanResponse {
    pub asset_id: AssetId,
    pub filename: String,
    pub blob_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub orphaned_at: OffsetDateTime,
    pub attempts: u32,
    pub last_error: String,
}

impl From<OrphanRecord> for OrphanResponse {
    fn from(record: OrphanRecord) -> Self {
        Self {
            asset_id: record.asset_id,
            filename: record.filename,
            blob_key: record.blob_key,
            orphaned_at: record.orphaned_at,
            attempts: record.attempts,
            last_error: record.last_error,
        }
    }
}

/// Orphan listing response.
#[derive(Debug, Serialize)]
pub struct OrphanListResponse {
    pub orphans: Vec<OrphanResponse>,
    pub count: usize,
}

/// GET /v1/admin/orphans
///
/// Retry a listed orphan with `DELETE /v1/assets/{asset_id}`; only the
/// metadata step runs again.
pub async fn list_orphans(State(state): State<AppState>) -> ApiResult<Json<OrphanListResponse>> {
    let orphans: Vec<OrphanResponse> = state
        .catalog
        .orphaned_assets()
        .into_iter()
        .map(OrphanResponse::from)
        .collect();
    Ok(Json(OrphanListResponse {
        count: orphans.len(),
        orphans,
    }))
}
