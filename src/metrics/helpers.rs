//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    GATEWAY_ATTEMPTS_EXHAUSTED_TOTAL, GATEWAY_ATTEMPTS_TOTAL, GATEWAY_ERRORS_TOTAL,
    GATEWAY_REQUESTS_TOTAL, GATEWAY_REQUEST_LATENCY, GATEWAY_RETRIES_TOTAL,
    RECIPIENTS_DELIVERED_TOTAL, RECIPIENTS_FAILED_TOTAL, RECIPIENTS_REPLACED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording gateway request metrics
pub struct RequestMetrics;

impl RequestMetrics {
    /// Record a request that the gateway answered with 200
    pub fn record_completed(mode: &str) {
        GATEWAY_REQUESTS_TOTAL.with_label_values(&[mode]).inc();
    }

    /// Record one attempt's round trip time
    pub fn record_latency(elapsed: Duration) {
        GATEWAY_REQUEST_LATENCY.observe(elapsed.as_secs_f64());
    }

    /// Record a failed attempt
    pub fn record_error(code: &str) {
        GATEWAY_ERRORS_TOTAL.with_label_values(&[code]).inc();
    }
}

/// Helper struct for recording attempt loop metrics
pub struct RetryMetrics;

impl RetryMetrics {
    pub fn attempt() {
        GATEWAY_ATTEMPTS_TOTAL.inc();
    }

    pub fn retry() {
        GATEWAY_RETRIES_TOTAL.inc();
    }

    pub fn exhausted() {
        GATEWAY_ATTEMPTS_EXHAUSTED_TOTAL.inc();
    }
}

/// Helper struct for recording per-recipient outcomes
pub struct RecipientMetrics;

impl RecipientMetrics {
    pub fn record_delivered(count: u64) {
        RECIPIENTS_DELIVERED_TOTAL.inc_by(count);
    }

    pub fn record_failed(error: &str, count: u64) {
        RECIPIENTS_FAILED_TOTAL
            .with_label_values(&[error])
            .inc_by(count);
    }

    pub fn record_replaced(count: u64) {
        RECIPIENTS_REPLACED_TOTAL.inc_by(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_contains_recorded_counters() {
        RetryMetrics::attempt();
        RequestMetrics::record_completed("structured");
        RecipientMetrics::record_failed("NotRegistered", 2);

        let output = encode_metrics().unwrap();
        assert!(output.contains("ara_push_gateway_attempts_total"));
        assert!(output.contains("ara_push_gateway_requests_total"));
        assert!(output.contains("NotRegistered"));
    }
}
