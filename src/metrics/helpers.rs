//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    API_KEYS_ISSUED_TOTAL, API_KEYS_REVOKED_TOTAL, API_KEY_VALIDATIONS_TOTAL, DELIVERY_LATENCY,
    DELIVERY_RETRIES_TOTAL, EMAILS_FAILED_TOTAL, EMAILS_QUEUED_TOTAL, EMAILS_REJECTED_TOTAL,
    EMAILS_SENT_TOTAL, QUEUE_DEPTH, RATELIMIT_ALLOWED_TOTAL, RATELIMIT_DENIED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording send request metrics
pub struct SendMetrics;

impl SendMetrics {
    pub fn record_queued() {
        EMAILS_QUEUED_TOTAL.inc();
    }

    /// `reason` is a short error code such as `missing_variables`
    pub fn record_rejected(reason: &str) {
        EMAILS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }
}

/// Helper struct for recording delivery worker metrics
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    pub fn record_sent(provider: &str, latency_seconds: f64) {
        EMAILS_SENT_TOTAL.with_label_values(&[provider]).inc();
        DELIVERY_LATENCY.observe(latency_seconds);
    }

    pub fn record_retry() {
        DELIVERY_RETRIES_TOTAL.inc();
    }

    pub fn record_failed() {
        EMAILS_FAILED_TOTAL.inc();
    }

    pub fn set_queue_depth(depth: usize) {
        QUEUE_DEPTH.set(depth as i64);
    }
}

/// Helper struct for recording API key metrics
pub struct ApiKeyMetrics;

impl ApiKeyMetrics {
    pub fn record_validation(valid: bool) {
        let result = if valid { "valid" } else { "invalid" };
        API_KEY_VALIDATIONS_TOTAL.with_label_values(&[result]).inc();
    }

    pub fn record_issued() {
        API_KEYS_ISSUED_TOTAL.inc();
    }

    pub fn record_revoked() {
        API_KEYS_REVOKED_TOTAL.inc();
    }
}

/// Helper struct for recording rate limiting metrics
pub struct RateLimitMetrics;

impl RateLimitMetrics {
    pub fn record_allowed() {
        RATELIMIT_ALLOWED_TOTAL.inc();
    }

    pub fn record_denied() {
        RATELIMIT_DENIED_TOTAL.inc();
    }
}
