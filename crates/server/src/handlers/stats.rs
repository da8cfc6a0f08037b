//! Catalog overview endpoint.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use vault_core::{Asset, CatalogStats};

/// Overview response: counters plus the newest assets.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CatalogStats,
    pub recent: Vec<Asset>,
}

/// GET /v1/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let stats = state.catalog.stats().await?;
    let recent = state
        .catalog
        .recent(state.config.server.recent_limit)
        .await?;
    Ok(Json(StatsResponse { stats, recent }))
}
