//! Tag endpoints.

use crate::error::ApiResult;
use crate::handlers::common::{parse_tag_id, read_json};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use vault_core::{NewTag, Tag, TagPatch};

/// GET /v1/tags
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.catalog.list_tags().await?))
}

/// POST /v1/tags
pub async fn create_tag(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let body: NewTag = read_json(req).await?;
    let tag = state.catalog.create_tag(body).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PATCH /v1/tags/{tag_id}
pub async fn update_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<String>,
    req: Request,
) -> ApiResult<Json<Tag>> {
    let id = parse_tag_id(&tag_id)?;
    let patch: TagPatch = read_json(req).await?;
    Ok(Json(state.catalog.update_tag(id, patch).await?))
}

/// DELETE /v1/tags/{tag_id}
pub async fn delete_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_tag_id(&tag_id)?;
    state.catalog.delete_tag(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
