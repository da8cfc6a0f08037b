//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, patch, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        // Assets
        .route(
            "/v1/assets",
            get(handlers::list_assets).post(handlers::upload_asset),
        )
        .route(
            "/v1/assets/{asset_id}",
            get(handlers::get_asset)
                .patch(handlers::update_asset)
                .delete(handlers::delete_asset),
        )
        .route(
            "/v1/assets/{asset_id}/content",
            get(handlers::get_asset_content),
        )
        .route(
            "/v1/assets/{asset_id}/tags/{tag_id}",
            put(handlers::tag_asset).delete(handlers::untag_asset),
        )
        // Tags
        .route(
            "/v1/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route(
            "/v1/tags/{tag_id}",
            patch(handlers::update_tag).delete(handlers::delete_tag),
        )
        // Overview and operator endpoints
        .route("/v1/stats", get(handlers::get_stats))
        .route("/v1/admin/orphans", get(handlers::list_orphans));

    let mut router = Router::new().merge(api_routes);

    // /metrics is unauthenticated and only mounted when enabled.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
