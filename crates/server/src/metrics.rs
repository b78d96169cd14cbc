//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the batchgen server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Campaign counts by status (collected dynamically)
//! - Active batch runs (collected dynamically)

use batchgen_core::{CampaignFilter, CampaignStatus};
use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "batchgen_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("batchgen_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "batchgen_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Campaign Metrics (collected dynamically)
// =============================================================================

/// Campaigns by current status.
pub static CAMPAIGNS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "batchgen_campaigns_by_status",
            "Current campaign count by status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Batch runs executing in this process.
pub static ACTIVE_RUNS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "batchgen_active_runs",
        "Number of campaign batch runs currently executing",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Campaigns
    registry
        .register(Box::new(CAMPAIGNS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(ACTIVE_RUNS.clone())).unwrap();

    // Core metrics (items, retries, batch runs)
    for metric in batchgen_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the campaign store and the orchestrator.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Some(orchestrator) = state.orchestrator() {
        let status = orchestrator.status().await;
        ACTIVE_RUNS.set(status.active_runs.len() as i64);
    }

    for status in CampaignStatus::ALL {
        let filter = CampaignFilter::new()
            .with_status(status)
            .with_limit(i64::MAX);
        if let Ok(campaigns) = state.store().list(&filter) {
            CAMPAIGNS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(campaigns.len() as i64);
        }
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    // Replace UUIDs and item indices with placeholders
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{index}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/campaigns/550e8400-e29b-41d4-a716-446655440000/progress";
        assert_eq!(normalize_path(path), "/api/v1/campaigns/{id}/progress");
    }

    #[test]
    fn test_normalize_path_item_index() {
        let path = "/api/v1/campaigns/550e8400-e29b-41d4-a716-446655440000/items/12/retry";
        assert_eq!(
            normalize_path(path),
            "/api/v1/campaigns/{id}/items/{index}/retry"
        );
    }

    #[test]
    fn test_normalize_path_trailing_index() {
        let path = "/api/v1/campaigns/550e8400-e29b-41d4-a716-446655440000/items/3";
        assert_eq!(normalize_path(path), "/api/v1/campaigns/{id}/items/{index}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        // Access metrics to ensure they're initialized
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("batchgen_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_campaign_metrics() {
        // Prometheus only outputs metrics that have been accessed
        CAMPAIGNS_BY_STATUS.with_label_values(&["draft"]).set(0);
        ACTIVE_RUNS.set(0);
        batchgen_core::metrics::AUTOMATIC_RETRIES.inc();

        let output = encode_metrics();

        assert!(output.contains("batchgen_campaigns_by_status"));
        assert!(output.contains("batchgen_active_runs"));
        assert!(output.contains("batchgen_automatic_retries_total"));
    }
}
