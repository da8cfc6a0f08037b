//! Prometheus metrics for the catalog engine.
//!
//! Counters cover search traffic, result-cache effectiveness, uploads and
//! the deletion pipeline. The orphaned-assets gauge is the operator signal
//! for deletions stuck between the blob and metadata steps.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Search metrics
pub static SEARCHES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("vault_searches_total", "Total number of catalog searches")
        .expect("metric creation failed")
});

pub static SEARCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "vault_search_duration_seconds",
            "Time taken to answer a search, including cache hits",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
    )
    .expect("metric creation failed")
});

pub static INDEX_RESYNCS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_tag_index_resyncs_total",
        "Total number of tag index entries corrected from a metadata read",
    )
    .expect("metric creation failed")
});

// Cache metrics
pub static CACHE_LOOKUPS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_cache_lookups_total",
            "Result cache lookups by outcome (hit, miss, stale)",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static CACHE_INVALIDATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_cache_invalidations_total",
            "Result cache invalidations by mutation",
        ),
        &["mutation"],
    )
    .expect("metric creation failed")
});

// Upload metrics
pub static UPLOADS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("vault_uploads_total", "Uploads by outcome"),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static BYTES_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_bytes_uploaded_total",
        "Total bytes of successfully catalogued uploads",
    )
    .expect("metric creation failed")
});

// Deletion metrics
pub static DELETIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("vault_deletions_total", "Asset deletions by outcome"),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static ORPHANED_ASSETS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "vault_orphaned_assets",
        "Assets whose blob is gone but whose metadata removal has not yet succeeded",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(SEARCHES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SEARCH_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INDEX_RESYNCS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_LOOKUPS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_INVALIDATIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOADS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_UPLOADED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DELETIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ORPHANED_ASSETS.clone()))
            .expect("metric registration failed");
    });
}

/// Helper to record a deletion outcome.
pub fn record_deletion(outcome: &str) {
    DELETIONS.with_label_values(&[outcome]).inc();
}

/// Helper to record an upload outcome.
pub fn record_upload(outcome: &str) {
    UPLOADS.with_label_values(&[outcome]).inc();
}
