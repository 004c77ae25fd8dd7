//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming. The gateway installs the
//! exporter; everything here only records through the `metrics` facade.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CardForge metrics
pub const METRICS_PREFIX: &str = "cardforge";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
];

/// Buckets for AI generation latency (model calls are slow)
pub const GENERATION_BUCKETS: &[f64] = &[
    0.5,   // 500ms
    1.0,   // 1s
    2.5,   // 2.5s
    5.0,   // 5s
    10.0,  // 10s
    20.0,  // 20s
    30.0,  // 30s
    60.0,  // 1m
    120.0, // 2m
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "AI flashcard generation latency in seconds"
    );

    describe_counter!(
        format!("{}_generation_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Failed AI generations by error code"
    );

    describe_counter!(
        format!("{}_flashcards_approved_total", METRICS_PREFIX),
        Unit::Count,
        "Approved flashcards by resolved source"
    );

    describe_counter!(
        format!("{}_ai_tokens_total", METRICS_PREFIX),
        Unit::Count,
        "AI tokens consumed by model and kind"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a finished generation attempt
pub fn record_generation(duration_secs: f64, model: &str, error_code: Option<&str>) {
    match error_code {
        None => {
            histogram!(
                format!("{}_generation_duration_seconds", METRICS_PREFIX),
                "model" => model.to_string()
            )
            .record(duration_secs);
        }
        Some(code) => {
            counter!(
                format!("{}_generation_errors_total", METRICS_PREFIX),
                "model" => model.to_string(),
                "code" => code.to_string()
            )
            .increment(1);
        }
    }
}

/// Record flashcards persisted by an approval, per source tag
pub fn record_approved(source: &str, count: usize) {
    counter!(
        format!("{}_flashcards_approved_total", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .increment(count as u64);
}

/// Record token consumption reported by the AI provider
pub fn record_tokens(model: &str, prompt_tokens: u64, completion_tokens: u64) {
    counter!(
        format!("{}_ai_tokens_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "kind" => "prompt"
    )
    .increment(prompt_tokens);

    counter!(
        format!("{}_ai_tokens_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "kind" => "completion"
    )
    .increment(completion_tokens);
}
