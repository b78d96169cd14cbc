//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Item generation (results, durations, automatic retries)
//! - Campaign batch runs
//! - Progress persistence

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Item Metrics
// =============================================================================

/// Items processed total by result.
pub static ITEMS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("batchgen_items_processed_total", "Total items processed"),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Item generation duration in seconds, retry included.
pub static ITEM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "batchgen_item_duration_seconds",
            "Duration of a single item generation",
        )
        .buckets(vec![
            1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0,
        ]),
        &["result"],
    )
    .unwrap()
});

/// Automatic retries after a retryable failure.
pub static AUTOMATIC_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "batchgen_automatic_retries_total",
        "Total automatic item retries",
    )
    .unwrap()
});

/// Manual item retries requested through the API.
pub static MANUAL_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("batchgen_manual_retries_total", "Total manual item retries").unwrap()
});

// =============================================================================
// Campaign Metrics
// =============================================================================

/// Campaign batch runs total by result.
pub static CAMPAIGN_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("batchgen_campaign_runs_total", "Total campaign batch runs"),
        &["result"], // "completed", "failed", "paused", "cancelled", "error"
    )
    .unwrap()
});

/// Progress writes dropped because they could not be persisted.
pub static PROGRESS_WRITES_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "batchgen_progress_writes_dropped_total",
        "Total best-effort progress writes that were dropped",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Items
        Box::new(ITEMS_PROCESSED.clone()),
        Box::new(ITEM_DURATION.clone()),
        Box::new(AUTOMATIC_RETRIES.clone()),
        Box::new(MANUAL_RETRIES.clone()),
        // Campaigns
        Box::new(CAMPAIGN_RUNS.clone()),
        Box::new(PROGRESS_WRITES_DROPPED.clone()),
    ]
}
