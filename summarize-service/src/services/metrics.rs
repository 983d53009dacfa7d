//! Prometheus metrics for summarize-service.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Request metrics
pub static SUMMARIZE_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static SUMMARIZE_TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Quota metrics
pub static QUOTA_DENIALS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static USAGE_WRITE_FAILURES_TOTAL: OnceLock<IntCounter> = OnceLock::new();

// Provider metrics
pub static PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Database metrics
pub static DB_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Must be called once at startup.
pub fn init_metrics() {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new(
            "summarize_requests_total",
            "Total summarization requests by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create summarize_requests_total metric");

    let tokens_total = IntCounterVec::new(
        Opts::new("summarize_tokens_total", "Total tokens processed"),
        &["model", "type"], // type: input, output
    )
    .expect("Failed to create summarize_tokens_total metric");

    let quota_denials = IntCounterVec::new(
        Opts::new("quota_denials_total", "Total quota denials by reason"),
        &["reason"],
    )
    .expect("Failed to create quota_denials_total metric");

    let usage_write_failures = IntCounter::new(
        "usage_write_failures_total",
        "Usage-log writes that failed after a response was already produced",
    )
    .expect("Failed to create usage_write_failures_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "provider_latency_seconds",
            "Upstream provider latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model"],
    )
    .expect("Failed to create provider_latency_seconds metric");

    let provider_errors = IntCounterVec::new(
        Opts::new("provider_errors_total", "Total upstream provider errors"),
        &["provider", "error_type"],
    )
    .expect("Failed to create provider_errors_total metric");

    let db_errors = IntCounterVec::new(
        Opts::new("db_errors_total", "Total external-store errors"),
        &["operation"],
    )
    .expect("Failed to create db_errors_total metric");

    registry
        .register(Box::new(requests_total.clone()))
        .expect("Failed to register summarize_requests_total");
    registry
        .register(Box::new(tokens_total.clone()))
        .expect("Failed to register summarize_tokens_total");
    registry
        .register(Box::new(quota_denials.clone()))
        .expect("Failed to register quota_denials_total");
    registry
        .register(Box::new(usage_write_failures.clone()))
        .expect("Failed to register usage_write_failures_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register provider_latency_seconds");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register provider_errors_total");
    registry
        .register(Box::new(db_errors.clone()))
        .expect("Failed to register db_errors_total");

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = SUMMARIZE_REQUESTS_TOTAL.set(requests_total);
    let _ = SUMMARIZE_TOKENS_TOTAL.set(tokens_total);
    let _ = QUOTA_DENIALS_TOTAL.set(quota_denials);
    let _ = USAGE_WRITE_FAILURES_TOTAL.set(usage_write_failures);
    let _ = PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);
    let _ = DB_ERRORS_TOTAL.set(db_errors);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

// Helper functions for recording metrics

/// Record a completed request by outcome.
pub fn record_request(outcome: &str) {
    if let Some(counter) = SUMMARIZE_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record token consumption per model.
pub fn record_tokens(model: &str, input_tokens: i64, output_tokens: i64) {
    if let Some(counter) = SUMMARIZE_TOKENS_TOTAL.get() {
        counter
            .with_label_values(&[model, "input"])
            .inc_by(input_tokens.max(0) as u64);
        counter
            .with_label_values(&[model, "output"])
            .inc_by(output_tokens.max(0) as u64);
    }
}

/// Record a quota denial.
pub fn record_quota_denial(reason: &str) {
    if let Some(counter) = QUOTA_DENIALS_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}

/// Record a failed post-call usage write (the response was still returned).
pub fn record_usage_write_failure() {
    if let Some(counter) = USAGE_WRITE_FAILURES_TOTAL.get() {
        counter.inc();
    }
}

/// Record upstream provider latency.
pub fn record_provider_latency(provider: &str, model: &str, duration_secs: f64) {
    if let Some(histogram) = PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

/// Record an upstream provider error.
pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
}

/// Record an external-store error.
pub fn record_db_error(operation: &str) {
    if let Some(counter) = DB_ERRORS_TOTAL.get() {
        counter.with_label_values(&[operation]).inc();
    }
}
