//! Prometheus metrics for the email simulation service.
//!
//! - Send requests and delivery outcomes
//! - Delivery queue depth and retries
//! - API key validation and per-key rate limiting

mod helpers;

pub use helpers::{encode_metrics, ApiKeyMetrics, DeliveryMetrics, RateLimitMetrics, SendMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "edunotify";

lazy_static! {
    // ============================================================================
    // Send Metrics
    // ============================================================================

    /// Send requests accepted and queued
    pub static ref EMAILS_QUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_emails_queued_total", METRIC_PREFIX),
        "Total send requests accepted and queued"
    ).unwrap();

    /// Send requests rejected before queueing, by reason
    pub static ref EMAILS_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_emails_rejected_total", METRIC_PREFIX),
        "Total send requests rejected before queueing",
        &["reason"]
    ).unwrap();

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Emails handed to the provider successfully, by provider
    pub static ref EMAILS_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_emails_sent_total", METRIC_PREFIX),
        "Total emails delivered to the provider",
        &["provider"]
    ).unwrap();

    /// Emails marked failed after the last attempt
    pub static ref EMAILS_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_emails_failed_total", METRIC_PREFIX),
        "Total emails that exhausted all delivery attempts"
    ).unwrap();

    /// Delivery attempts scheduled for retry
    pub static ref DELIVERY_RETRIES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_delivery_retries_total", METRIC_PREFIX),
        "Total delivery attempts rescheduled after a transport failure"
    ).unwrap();

    /// Provider call latency in seconds
    pub static ref DELIVERY_LATENCY: Histogram = register_histogram!(
        format!("{}_delivery_latency_seconds", METRIC_PREFIX),
        "Email provider call latency in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    /// Jobs waiting in the delivery queue
    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        format!("{}_queue_depth", METRIC_PREFIX),
        "Jobs waiting in the delivery queue"
    ).unwrap();

    // ============================================================================
    // API Key Metrics
    // ============================================================================

    /// API key validations by result (valid, invalid)
    pub static ref API_KEY_VALIDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_api_key_validations_total", METRIC_PREFIX),
        "Total API key validations",
        &["result"]
    ).unwrap();

    pub static ref API_KEYS_ISSUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_api_keys_issued_total", METRIC_PREFIX),
        "Total API keys issued"
    ).unwrap();

    pub static ref API_KEYS_REVOKED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_api_keys_revoked_total", METRIC_PREFIX),
        "Total API keys revoked"
    ).unwrap();

    // ============================================================================
    // Rate Limiting Metrics
    // ============================================================================

    pub static ref RATELIMIT_ALLOWED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_ratelimit_allowed_total", METRIC_PREFIX),
        "Total API key requests allowed by the rate limiter"
    ).unwrap();

    pub static ref RATELIMIT_DENIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_ratelimit_denied_total", METRIC_PREFIX),
        "Total API key requests denied by the rate limiter"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        // lazy_static registers on first access
        EMAILS_QUEUED_TOTAL.inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("edunotify_emails_queued_total"));
    }

    #[test]
    fn test_delivery_metrics() {
        DeliveryMetrics::record_sent("simulated", 0.02);
        DeliveryMetrics::record_retry();
        DeliveryMetrics::record_failed();
        DeliveryMetrics::set_queue_depth(3);
        assert_eq!(QUEUE_DEPTH.get(), 3);
    }

    #[test]
    fn test_api_key_metrics() {
        let before = API_KEY_VALIDATIONS_TOTAL.with_label_values(&["invalid"]).get();
        ApiKeyMetrics::record_validation(false);
        assert!(API_KEY_VALIDATIONS_TOTAL.with_label_values(&["invalid"]).get() > before);
    }
}
