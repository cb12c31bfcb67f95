// src/rate_limit.rs
// Named fixed-window counters keyed by (operation, userId) (§4.7).
//
// Generalized from utils/rate_limiter.rs's single NotKeyed governor bucket
// into a HashMap-backed registry that lazily creates a per-key bucket sized
// from the operation's configured limit/window, per SPEC_FULL.md's own
// implementation note.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use tokio::sync::RwLock;
use tracing::warn;

type Bucket = Arc<GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after: i64,
}

pub struct RateLimiter {
    buckets: RwLock<HashMap<(String, String), Bucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// `Allow(key, limit, window) -> {allowed, remaining, retryAfter}`. A
    /// `limit` of 0 bypasses the bucket entirely. Internal errors degrade to
    /// allowed, logged, per §4.7's "degradation" clause.
    pub async fn allow(&self, operation: &str, user_id: &str, limit: u32, window: Duration) -> RateDecision {
        if limit == 0 {
            return RateDecision {
                allowed: true,
                remaining: u32::MAX,
                retry_after: 0,
            };
        }

        let key = (operation.to_string(), user_id.to_string());

        let bucket = {
            let read = self.buckets.read().await;
            read.get(&key).cloned()
        };

        let bucket = match bucket {
            Some(b) => b,
            None => {
                let Some(nonzero_limit) = NonZeroU32::new(limit) else {
                    warn!("rate limiter: invalid limit {limit} for {operation}, allowing");
                    return RateDecision {
                        allowed: true,
                        remaining: 0,
                        retry_after: 0,
                    };
                };
                let quota = Quota::with_period(window)
                    .map(|q| q.allow_burst(nonzero_limit))
                    .unwrap_or_else(|| Quota::per_second(nonzero_limit));
                let created: Bucket = Arc::new(GovRateLimiter::direct(quota));
                let mut write = self.buckets.write().await;
                write.entry(key).or_insert_with(|| created.clone()).clone()
            }
        };

        match bucket.check() {
            Ok(_) => RateDecision {
                allowed: true,
                remaining: limit.saturating_sub(1),
                retry_after: 0,
            },
            Err(not_until) => {
                let retry_after = not_until
                    .wait_time_from(governor::clock::DefaultClock::default().now())
                    .as_secs() as i64;
                RateDecision {
                    allowed: false,
                    remaining: 0,
                    retry_after,
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);
        assert!(limiter.allow("interpret", "u1", 2, window).await.allowed);
        assert!(limiter.allow("interpret", "u1", 2, window).await.allowed);
        let third = limiter.allow("interpret", "u1", 2, window).await;
        assert!(!third.allowed);
        assert!(third.retry_after >= 0);
    }

    #[tokio::test]
    async fn separate_operations_have_independent_buckets() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);
        assert!(limiter.allow("interpret", "u1", 1, window).await.allowed);
        assert!(limiter.allow("generate", "u1", 1, window).await.allowed);
    }

    #[tokio::test]
    async fn zero_limit_bypasses_bucket() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);
        for _ in 0..5 {
            assert!(limiter.allow("publish", "u1", 0, window).await.allowed);
        }
    }
}
