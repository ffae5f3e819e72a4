// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the IONOS Cloud DNS-01 webhook.
//!
//! All metrics carry the namespace prefix `ionos_cloud_webhook_`.
//!
//! # Metrics Categories
//!
//! - **Challenge Metrics** - `Present` / `CleanUp` outcomes and durations
//! - **Provider Metrics** - IONOS Cloud DNS API calls and their outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use ionos_cloud_webhook::metrics::record_challenge_success;
//!
//! record_challenge_success("Present", std::time::Duration::from_millis(250));
//! ```

use crate::constants::METRICS_NAMESPACE;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Challenge Metrics
// ============================================================================

/// Total number of challenge operations by action and outcome
///
/// Labels:
/// - `action`: `Present` or `CleanUp`
/// - `status`: `success` or the error kind (e.g. `zone_not_found`)
pub static CHALLENGES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_challenges_total"),
        "Total number of challenge operations by action and status",
    );
    let counter = CounterVec::new(opts, &["action", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of challenge operations in seconds
///
/// Labels:
/// - `action`: `Present` or `CleanUp`
pub static CHALLENGE_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_challenge_duration_seconds"),
        "Duration of challenge operations in seconds by action",
    )
    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Provider Metrics
// ============================================================================

/// Total number of IONOS Cloud DNS API calls
///
/// Labels:
/// - `operation`: `get_zones`, `create_zone`, `get_records`, `create_record`, `delete_record`
/// - `status`: `success` or the error kind (`transport`, `status`, `decode`)
pub static PROVIDER_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_provider_requests_total"),
        "Total number of IONOS Cloud DNS API requests by operation and status",
    );
    let counter = CounterVec::new(opts, &["operation", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful challenge operation
///
/// # Arguments
/// * `action` - `Present` or `CleanUp`
/// * `duration` - Duration of the operation
pub fn record_challenge_success(action: &str, duration: Duration) {
    CHALLENGES_TOTAL
        .with_label_values(&[action, "success"])
        .inc();
    CHALLENGE_DURATION_SECONDS
        .with_label_values(&[action])
        .observe(duration.as_secs_f64());
}

/// Record a failed challenge operation
///
/// # Arguments
/// * `action` - `Present` or `CleanUp`
/// * `error_kind` - Category of the failure
/// * `duration` - Duration of the operation before failure
pub fn record_challenge_error(action: &str, error_kind: &str, duration: Duration) {
    CHALLENGES_TOTAL
        .with_label_values(&[action, error_kind])
        .inc();
    CHALLENGE_DURATION_SECONDS
        .with_label_values(&[action])
        .observe(duration.as_secs_f64());
}

/// Record an IONOS Cloud DNS API call
///
/// # Arguments
/// * `operation` - API operation name
/// * `status` - `success` or error kind
pub fn record_provider_request(operation: &str, status: &str) {
    PROVIDER_REQUESTS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
