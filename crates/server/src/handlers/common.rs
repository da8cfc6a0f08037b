//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use axum::extract::Request;
use serde::de::DeserializeOwned;
use vault_core::{AssetId, TagId};

/// Maximum size of a JSON request body (64 KiB).
pub const MAX_JSON_BODY_SIZE: usize = 64 * 1024;

/// Read and decode a JSON request body.
pub async fn read_json<T: DeserializeOwned>(req: Request) -> ApiResult<T> {
    let bytes = axum::body::to_bytes(req.into_body(), MAX_JSON_BODY_SIZE)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

pub fn parse_asset_id(raw: &str) -> ApiResult<AssetId> {
    Ok(AssetId::parse(raw)?)
}

pub fn parse_tag_id(raw: &str) -> ApiResult<TagId> {
    Ok(TagId::parse(raw)?)
}

/// Parse a comma-separated tag list. Blank segments are skipped, so an
/// empty string yields an empty (but applied) filter.
pub fn parse_tag_list(raw: &str) -> ApiResult<Vec<TagId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_tag_id)
        .collect()
}
