//! Prometheus metrics for the vault server.
//!
//! Catalog metrics live in [`vault_catalog::metrics`]; this module adds the
//! HTTP-side counters to the same registry and serves `/metrics`.
//!
//! The endpoint is unauthenticated; `server.metrics_enabled = false` leaves it unmounted.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};
use std::sync::{LazyLock, Once};
use vault_catalog::metrics::REGISTRY;

pub static BYTES_DOWNLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_bytes_downloaded_total",
        "Total asset bytes served through the content endpoint",
    )
    .expect("metric creation failed")
});

pub static API_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("vault_api_errors_total", "API error responses by error code"),
        &["code"],
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register catalog and server metrics with the shared registry.
pub fn register_metrics() {
    vault_catalog::metrics::register_metrics();
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(BYTES_DOWNLOADED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(API_ERRORS.clone()))
            .expect("metric registration failed");
    });
}

/// Count an error response by code.
pub fn record_api_error(code: &str) {
    API_ERRORS.with_label_values(&[code]).inc();
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}
