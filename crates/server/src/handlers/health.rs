//! Health check endpoint.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage_backend: &'static str,
}

/// GET /v1/health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let catalog = &state.catalog;
    catalog
        .metadata()
        .health_check()
        .await
        .map_err(|e| ApiError::Unavailable(format!("metadata store: {e}")))?;
    catalog
        .blobs()
        .health_check()
        .await
        .map_err(|e| ApiError::Unavailable(format!("blob store: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage_backend: catalog.blobs().backend_name(),
    }))
}
