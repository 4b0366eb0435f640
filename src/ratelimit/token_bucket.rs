//! Token bucket sized in requests per minute.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Tokens are tracked in thousandths so slow refill rates accumulate precisely.
const SCALE: u64 = 1_000;
const WINDOW_MS: u64 = 60_000;

#[derive(Debug)]
struct BucketState {
    millitokens: u64,
    last_refill: i64,
}

/// Token bucket that starts full and regains `capacity` tokens every minute.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket allowing `capacity` requests per minute.
    pub fn per_minute(capacity: u32) -> Self {
        Self {
            capacity,
            state: Mutex::new(BucketState {
                millitokens: capacity as u64 * SCALE,
                last_refill: Self::now_millis(),
            }),
        }
    }

    pub(crate) fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Take one token. Returns false when the bucket is empty.
    pub fn try_consume(&self) -> bool {
        self.try_consume_at(Self::now_millis())
    }

    fn try_consume_at(&self, now: i64) -> bool {
        let mut state = self.lock();
        self.refill(&mut state, now);
        if state.millitokens >= SCALE {
            state.millitokens -= SCALE;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available.
    pub fn available(&self) -> u32 {
        let mut state = self.lock();
        self.refill(&mut state, Self::now_millis());
        (state.millitokens / SCALE) as u32
    }

    /// Seconds until the next token is available, at least 1.
    pub fn retry_after(&self) -> u64 {
        self.retry_after_at(Self::now_millis())
    }

    fn retry_after_at(&self, now: i64) -> u64 {
        let mut state = self.lock();
        self.refill(&mut state, now);
        if state.millitokens >= SCALE || self.capacity == 0 {
            return 1;
        }
        let missing = SCALE - state.millitokens;
        // millitokens regained per ms = capacity / 60
        let wait_ms = (missing * 60).div_ceil(self.capacity as u64);
        wait_ms.div_ceil(1_000).max(1)
    }

    /// Millisecond timestamp of the last refill, used to expire idle buckets.
    pub fn last_activity(&self) -> i64 {
        self.lock().last_refill
    }

    fn refill(&self, state: &mut BucketState, now: i64) {
        let elapsed = now.saturating_sub(state.last_refill);
        if elapsed <= 0 {
            return;
        }
        let max = self.capacity as u64 * SCALE;
        let gained = elapsed as u64 * self.capacity as u64 * SCALE / WINDOW_MS;
        state.millitokens = (state.millitokens + gained).min(max);
        state.last_refill = now;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bucket_is_full() {
        let bucket = TokenBucket::per_minute(10);
        assert_eq!(bucket.capacity(), 10);
        assert_eq!(bucket.available(), 10);
    }

    #[test]
    fn test_consume_until_empty() {
        let bucket = TokenBucket::per_minute(3);
        let now = bucket.last_activity();

        assert!(bucket.try_consume_at(now));
        assert!(bucket.try_consume_at(now));
        assert!(bucket.try_consume_at(now));
        assert!(!bucket.try_consume_at(now));
    }

    #[test]
    fn test_refills_over_the_minute() {
        let bucket = TokenBucket::per_minute(60);
        let now = bucket.last_activity();
        for _ in 0..60 {
            assert!(bucket.try_consume_at(now));
        }
        assert!(!bucket.try_consume_at(now));

        // one token per second at 60/min
        assert!(!bucket.try_consume_at(now + 500));
        assert!(bucket.try_consume_at(now + 1_000));
    }

    #[test]
    fn test_refill_never_exceeds_capacity() {
        let bucket = TokenBucket::per_minute(2);
        let now = bucket.last_activity();
        assert!(bucket.try_consume_at(now));
        assert!(bucket.try_consume_at(now + 10 * WINDOW_MS as i64));
        assert!(bucket.try_consume_at(now + 10 * WINDOW_MS as i64));
        assert!(!bucket.try_consume_at(now + 10 * WINDOW_MS as i64));
    }

    #[test]
    fn test_retry_after_reflects_refill_rate() {
        let bucket = TokenBucket::per_minute(1);
        let now = bucket.last_activity();
        assert!(bucket.try_consume_at(now));
        assert_eq!(bucket.retry_after_at(now), 60);
        assert_eq!(bucket.retry_after_at(now + 30_000), 30);

        let fast = TokenBucket::per_minute(600);
        let now = fast.last_activity();
        for _ in 0..600 {
            fast.try_consume_at(now);
        }
        assert_eq!(fast.retry_after_at(now), 1);
    }
}
