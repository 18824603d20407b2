//! Prometheus metrics for the stub server.
//!
//! Tracks served requests, injected delays and faults, script execution and
//! upstream proxying.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Total number of requests served
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "stubsmith_requests_total",
        "Total number of requests served",
        &["method", "status", "matched"]
    )
    .unwrap();

    /// Responses rendered by source
    pub static ref RESPONSES_RENDERED_TOTAL: CounterVec = register_counter_vec!(
        "stubsmith_responses_rendered_total",
        "Total number of responses rendered",
        &["source"]  // source: direct|proxy|not_configured
    )
    .unwrap();

    /// Transformer invocations
    pub static ref TRANSFORMER_INVOCATIONS_TOTAL: CounterVec = register_counter_vec!(
        "stubsmith_transformer_invocations_total",
        "Total number of transformer invocations",
        &["transformer", "result"]  // result: ok|error
    )
    .unwrap();

    /// Faults emulated at the transport
    pub static ref FAULTS_TOTAL: CounterVec = register_counter_vec!(
        "stubsmith_faults_total",
        "Total number of emulated transport faults",
        &["fault"]
    )
    .unwrap();

    /// Initial delay applied before a response is written
    pub static ref DELAY_APPLIED_MS: HistogramVec = register_histogram_vec!(
        "stubsmith_delay_applied_ms",
        "Histogram of initial response delays in milliseconds",
        &["kind"],  // kind: initial|dribble
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap();

    /// Script execution duration
    pub static ref SCRIPT_EXECUTION_DURATION_MS: HistogramVec = register_histogram_vec!(
        "stubsmith_script_execution_duration_ms",
        "Histogram of body script execution time in milliseconds",
        &["script", "result"],  // result: ok|error
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0]
    )
    .unwrap();

    /// Script source cache lookups
    pub static ref SCRIPT_CACHE_TOTAL: CounterVec = register_counter_vec!(
        "stubsmith_script_cache_total",
        "Script source cache lookups",
        &["result"]  // result: hit|miss
    )
    .unwrap();

    /// Upstream request duration for proxied stubs
    pub static ref UPSTREAM_REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "stubsmith_upstream_request_duration_ms",
        "Duration of upstream requests for proxied stubs",
        &["method", "status"]
    )
    .unwrap();

    /// Render failures by stage
    pub static ref RENDER_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "stubsmith_render_errors_total",
        "Total number of response rendering failures",
        &["stage"]  // stage: blob|script|transformer|proxy
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_request(method: &str, status: u16, matched: bool) {
    REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string(), if matched { "true" } else { "false" }])
        .inc();
}

pub fn record_rendered(source: &str) {
    RESPONSES_RENDERED_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_transformer(name: &str, ok: bool) {
    TRANSFORMER_INVOCATIONS_TOTAL
        .with_label_values(&[name, if ok { "ok" } else { "error" }])
        .inc();
}

pub fn record_fault(fault: &str) {
    FAULTS_TOTAL.with_label_values(&[fault]).inc();
}

pub fn record_delay(kind: &str, duration_ms: u64) {
    DELAY_APPLIED_MS
        .with_label_values(&[kind])
        .observe(duration_ms as f64);
}

pub fn record_script_execution(script: &str, duration_ms: f64, result: &str) {
    SCRIPT_EXECUTION_DURATION_MS
        .with_label_values(&[script, result])
        .observe(duration_ms);
}

pub fn record_script_cache(hit: bool) {
    SCRIPT_CACHE_TOTAL
        .with_label_values(&[if hit { "hit" } else { "miss" }])
        .inc();
}

pub fn record_upstream_duration(method: &str, status: u16, duration_ms: f64) {
    UPSTREAM_REQUEST_DURATION_MS
        .with_label_values(&[method, &status.to_string()])
        .observe(duration_ms);
}

pub fn record_render_error(stage: &str) {
    RENDER_ERRORS_TOTAL.with_label_values(&[stage]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        record_request("GET", 200, true);
        record_fault("EMPTY_RESPONSE");
        record_delay("initial", 150);
        record_script_execution("body.rhai", 1.5, "ok");
        record_script_cache(false);
        record_render_error("blob");
        record_rendered("direct");
        record_transformer("response-template", true);

        let output = collect_metrics();
        assert!(output.contains("stubsmith_requests_total"));
        assert!(output.contains("stubsmith_faults_total"));
        assert!(output.contains("stubsmith_delay_applied_ms"));
        assert!(output.contains("stubsmith_script_execution_duration_ms"));
        assert!(output.contains("stubsmith_script_cache_total"));
        assert!(output.contains("stubsmith_render_errors_total"));
        assert!(output.contains("stubsmith_responses_rendered_total"));
        assert!(output.contains("stubsmith_transformer_invocations_total"));
    }
}
