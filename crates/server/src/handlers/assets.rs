//! Asset endpoints: search, upload, read, edit, delete, tagging.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{parse_asset_id, parse_tag_id, parse_tag_list, read_json};
use crate::metrics::BYTES_DOWNLOADED;
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use vault_catalog::{DeletionReport, UploadRequest};
use vault_core::{Asset, AssetId, AssetPatch, SearchQuery};

/// Content type recorded when the uploader declares none.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Query parameters for `GET /v1/assets`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Case-insensitive substring of filename or description.
    pub q: Option<String>,
    /// Comma-separated tag ids. Absent means no tag filter; present but
    /// empty means a filter that selects nothing.
    pub tags: Option<String>,
}

impl SearchParams {
    fn into_query(self) -> ApiResult<SearchQuery> {
        let tag_ids = self.tags.as_deref().map(parse_tag_list).transpose()?;
        Ok(SearchQuery::new(self.q.as_deref(), tag_ids))
    }
}

/// Search response.
#[derive(Debug, Serialize)]
pub struct AssetListResponse {
    pub assets: Vec<Asset>,
    pub count: usize,
}

/// GET /v1/assets
#[tracing::instrument(skip(state))]
pub async fn list_assets(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<AssetListResponse>> {
    let query = params.into_query()?;
    let assets = state.catalog.search(&query).await?;
    Ok(Json(AssetListResponse {
        count: assets.len(),
        assets,
    }))
}

/// Query parameters for `POST /v1/assets`. The body is the raw file.
#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
    pub description: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Duration in seconds.
    pub duration: Option<f64>,
}

/// POST /v1/assets
#[tracing::instrument(skip(state, params, req), fields(filename))]
pub async fn upload_asset(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    req: Request,
) -> ApiResult<(StatusCode, Json<Asset>)> {
    let filename = params
        .filename
        .ok_or_else(|| ApiError::BadRequest("missing filename query parameter".to_string()))?;
    tracing::Span::current().record("filename", filename.as_str());

    let max = state.config.server.max_upload_bytes;
    let declared_len = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared_len.is_some_and(|len| len > max as u64) {
        return Err(ApiError::PayloadTooLarge(format!(
            "upload exceeds {max} bytes"
        )));
    }

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let data = axum::body::to_bytes(req.into_body(), max)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;

    let mut upload = UploadRequest::new(filename, content_type, data);
    upload.description = params.description;
    upload.width = params.width;
    upload.height = params.height;
    upload.duration_secs = params.duration;

    let asset = state.catalog.upload(upload).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// GET /v1/assets/{asset_id}
pub async fn get_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> ApiResult<Json<Asset>> {
    let id = parse_asset_id(&asset_id)?;
    Ok(Json(state.catalog.get_asset(id).await?))
}

/// GET /v1/assets/{asset_id}/content
pub async fn get_asset_content(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_asset_id(&asset_id)?;
    let (asset, data) = state.catalog.download(id).await?;
    BYTES_DOWNLOADED.inc_by(data.len() as u64);

    let content_type = HeaderValue::from_str(&asset.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"{}\"",
        asset.filename.replace(['"', '\\'], "_")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_LENGTH, HeaderValue::from(data.len())),
            (CONTENT_DISPOSITION, disposition),
        ],
        Body::from(data),
    )
        .into_response())
}

/// PATCH /v1/assets/{asset_id}
pub async fn update_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    req: Request,
) -> ApiResult<Json<Asset>> {
    let id = parse_asset_id(&asset_id)?;
    let patch: AssetPatch = read_json(req).await?;
    Ok(Json(state.catalog.edit_asset(id, patch).await?))
}

/// Deletion response.
#[derive(Debug, Serialize)]
pub struct DeleteAssetResponse {
    pub asset_id: AssetId,
    pub state: &'static str,
    pub blob_already_absent: bool,
    pub resumed: bool,
}

impl From<DeletionReport> for DeleteAssetResponse {
    fn from(report: DeletionReport) -> Self {
        Self {
            asset_id: report.asset_id,
            state: report.state.as_str(),
            blob_already_absent: report.blob_already_absent,
            resumed: report.resumed,
        }
    }
}

/// DELETE /v1/assets/{asset_id}
#[tracing::instrument(skip(state))]
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> ApiResult<Json<DeleteAssetResponse>> {
    let id = parse_asset_id(&asset_id)?;
    let report = state.catalog.delete_asset(id).await?;
    Ok(Json(report.into()))
}

/// PUT /v1/assets/{asset_id}/tags/{tag_id}
pub async fn tag_asset(
    State(state): State<AppState>,
    Path((asset_id, tag_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let asset_id = parse_asset_id(&asset_id)?;
    let tag_id = parse_tag_id(&tag_id)?;
    state.catalog.tag_asset(asset_id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/assets/{asset_id}/tags/{tag_id}
pub async fn untag_asset(
    State(state): State<AppState>,
    Path((asset_id, tag_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let asset_id = parse_asset_id(&asset_id)?;
    let tag_id = parse_tag_id(&tag_id)?;
    state.catalog.untag_asset(asset_id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
