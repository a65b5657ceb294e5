//! Prometheus metrics for the push sender.
//!
//! - Request metrics (gateway requests by mode, request latency)
//! - Attempt metrics (attempts, retries, exhausted attempt budgets)
//! - Error metrics (gateway errors by class, transport errors)
//! - Recipient metrics (delivered, failed, replaced identifiers)

mod helpers;

pub use helpers::{encode_metrics, RecipientMetrics, RequestMetrics, RetryMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara_push";

lazy_static! {
    // ============================================================================
    // Request Metrics
    // ============================================================================

    /// Gateway requests by protocol mode (flat / structured)
    pub static ref GATEWAY_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_gateway_requests_total", METRIC_PREFIX),
        "Total gateway requests that completed with HTTP 200",
        &["mode"]
    ).unwrap();

    /// Gateway round trip latency
    pub static ref GATEWAY_REQUEST_LATENCY: Histogram = register_histogram!(
        format!("{}_gateway_request_latency_seconds", METRIC_PREFIX),
        "Gateway request latency in seconds, per attempt",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    // ============================================================================
    // Attempt Metrics
    // ============================================================================

    /// Every HTTP attempt, first tries included
    pub static ref GATEWAY_ATTEMPTS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_gateway_attempts_total", METRIC_PREFIX),
        "Total gateway attempts"
    ).unwrap();

    /// Attempts scheduled after a failure
    pub static ref GATEWAY_RETRIES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_gateway_retries_total", METRIC_PREFIX),
        "Total gateway retries after a failed attempt"
    ).unwrap();

    /// Sends that used up every attempt
    pub static ref GATEWAY_ATTEMPTS_EXHAUSTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_gateway_attempts_exhausted_total", METRIC_PREFIX),
        "Total chunks that failed after exhausting all attempts"
    ).unwrap();

    // ============================================================================
    // Error Metrics
    // ============================================================================

    /// Failed attempts by error code
    pub static ref GATEWAY_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_gateway_errors_total", METRIC_PREFIX),
        "Total failed gateway attempts by error code",
        &["code"]
    ).unwrap();

    // ============================================================================
    // Recipient Metrics
    // ============================================================================

    /// Recipients the gateway accepted
    pub static ref RECIPIENTS_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_recipients_delivered_total", METRIC_PREFIX),
        "Total recipients accepted by the gateway"
    ).unwrap();

    /// Recipients the gateway rejected, by error code
    pub static ref RECIPIENTS_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_recipients_failed_total", METRIC_PREFIX),
        "Total recipients rejected by the gateway",
        &["error"]
    ).unwrap();

    /// Recipients whose identifier should be replaced
    pub static ref RECIPIENTS_REPLACED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_recipients_replaced_total", METRIC_PREFIX),
        "Total recipients reported with a canonical replacement identifier"
    ).unwrap();
}
