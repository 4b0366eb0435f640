//! Per-API-key request limiter.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use super::token_bucket::TokenBucket;
use crate::apikey::ApiKeyIdentity;
use crate::error::AppError;
use crate::metrics::RateLimitMetrics;

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed { remaining: u32, limit: u32 },
    /// Request is denied until a token is regained
    Denied { retry_after: u64, limit: u32 },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Keeps one bucket per API key, sized by the key's own `rate_limit`
/// (requests per minute). Session callers are never limited here.
#[derive(Debug, Default)]
pub struct ApiKeyRateLimiter {
    buckets: DashMap<Uuid, Arc<TokenBucket>>,
}

impl ApiKeyRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against the key's bucket.
    pub fn check_key(&self, key_id: Uuid, limit: u32) -> RateLimitResult {
        let bucket = self.bucket_for(key_id, limit);

        if bucket.try_consume() {
            RateLimitMetrics::record_allowed();
            RateLimitResult::Allowed {
                remaining: bucket.available(),
                limit,
            }
        } else {
            RateLimitMetrics::record_denied();
            RateLimitResult::Denied {
                retry_after: bucket.retry_after(),
                limit,
            }
        }
    }

    /// Check an authenticated key, mapping a denial to `AppError::RateLimited`.
    pub fn check(&self, identity: &ApiKeyIdentity) -> Result<u32, AppError> {
        match self.check_key(identity.key_id, identity.rate_limit) {
            RateLimitResult::Allowed { remaining, .. } => Ok(remaining),
            RateLimitResult::Denied { retry_after, limit } => {
                tracing::warn!(
                    key_prefix = %identity.key_prefix,
                    limit = limit,
                    retry_after = retry_after,
                    "API key rate limit exceeded"
                );
                Err(AppError::RateLimited { retry_after, limit })
            }
        }
    }

    fn bucket_for(&self, key_id: Uuid, limit: u32) -> Arc<TokenBucket> {
        let mut entry = self
            .buckets
            .entry(key_id)
            .or_insert_with(|| Arc::new(TokenBucket::per_minute(limit)));

        // The key's limit is read on every request; start over if it changed.
        if entry.capacity() != limit {
            *entry = Arc::new(TokenBucket::per_minute(limit));
        }
        entry.value().clone()
    }

    /// Drop buckets idle for longer than `ttl`.
    pub fn cleanup_stale(&self, ttl: Duration) -> usize {
        let ttl_ms = ttl.as_millis() as i64;
        let now = TokenBucket::now_millis();
        let before = self.buckets.len();

        self.buckets
            .retain(|_, bucket| now - bucket.last_activity() < ttl_ms);

        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            tracing::debug!(
                removed = removed,
                key_buckets = self.buckets.len(),
                "Cleaned up stale rate limit buckets"
            );
        }
        removed
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            key_buckets: self.buckets.len(),
        }
    }
}

/// Statistics about the rate limiter
#[derive(Debug, Clone, Serialize)]
pub struct RateLimiterStats {
    pub key_buckets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apikey::Permission;

    fn identity(rate_limit: u32) -> ApiKeyIdentity {
        ApiKeyIdentity {
            key_id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            key_prefix: "edunotify_abcdef".to_string(),
            permissions: vec![Permission::SendEmail],
            rate_limit,
        }
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = ApiKeyRateLimiter::new();
        let key = identity(3);

        assert_eq!(limiter.check(&key).unwrap(), 2);
        assert_eq!(limiter.check(&key).unwrap(), 1);
        assert_eq!(limiter.check(&key).unwrap(), 0);

        match limiter.check(&key) {
            Err(AppError::RateLimited { retry_after, limit }) => {
                assert_eq!(limit, 3);
                assert!(retry_after >= 1 && retry_after <= 20);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_keys_are_limited_independently() {
        let limiter = ApiKeyRateLimiter::new();
        let first = identity(1);
        let second = identity(1);

        assert!(limiter.check(&first).is_ok());
        assert!(limiter.check(&first).is_err());
        assert!(limiter.check(&second).is_ok());
        assert_eq!(limiter.stats().key_buckets, 2);
    }

    #[test]
    fn test_limit_change_resets_bucket() {
        let limiter = ApiKeyRateLimiter::new();
        let mut key = identity(1);

        assert!(limiter.check(&key).is_ok());
        assert!(limiter.check(&key).is_err());

        key.rate_limit = 5;
        assert!(limiter.check(&key).is_ok());
    }

    #[test]
    fn test_cleanup_stale_buckets() {
        let limiter = ApiKeyRateLimiter::new();
        limiter.check_key(Uuid::new_v4(), 10);
        limiter.check_key(Uuid::new_v4(), 10);

        assert_eq!(limiter.cleanup_stale(Duration::from_secs(3600)), 0);
        assert_eq!(limiter.cleanup_stale(Duration::ZERO), 2);
        assert_eq!(limiter.stats().key_buckets, 0);
    }
}
