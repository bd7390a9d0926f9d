//! Rate Limiting Infrastructure
//!
//! Sliding-window request counting keyed by client identity.
//!
//! Every accepted request leaves its timestamp in the client's bucket. A
//! call prunes timestamps that have left the trailing window, rejects when
//! the remaining count has reached the limit and otherwise records itself.
//! The wait reported on rejection is measured from the oldest timestamp
//! still inside the window, so counting is exact across window boundaries.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Trailing window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// A named limit. The name namespaces the bucket keys so one client has
/// independent counters per policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub config: RateLimitConfig,
}

impl RateLimitPolicy {
    pub const fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self { name, config }
    }

    /// Login and registration: 5 per 15 minutes.
    pub fn auth() -> Self {
        Self::new("auth", RateLimitConfig::new(5, 15 * 60))
    }

    /// All other mutating traffic: 100 per minute.
    pub fn general() -> Self {
        Self::new("general", RateLimitConfig::new(100, 60))
    }

    /// Chat completions: 10 per minute.
    pub fn chat() -> Self {
        Self::new("chat", RateLimitConfig::new(10, 60))
    }

    /// File uploads: 5 per minute.
    pub fn uploads() -> Self {
        Self::new("uploads", RateLimitConfig::new(5, 60))
    }

    pub fn key_for(&self, client: &str) -> String {
        format!("{}:{}", self.name, client)
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Whole seconds until a slot frees up; only set on rejection.
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit backend unavailable: {0}")]
    Backend(String),
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Count this request against `key` and decide whether it may proceed.
    async fn check(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitDecision, RateLimitError>;
}

type Bucket = Arc<Mutex<VecDeque<i64>>>;

/// Process-local sliding window limiter.
///
/// The outer map lock is only held long enough to find or create a bucket;
/// the check itself runs under the bucket's own lock, so bursts from one
/// client serialize without blocking other clients.
#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_at(&self, key: &str, config: &RateLimitConfig, now_ms: i64) -> RateLimitDecision {
        let bucket = self.bucket(key);
        let mut timestamps = lock(&bucket);

        let window_ms = config.window_ms();
        while timestamps
            .front()
            .is_some_and(|&oldest| now_ms - oldest >= window_ms)
        {
            timestamps.pop_front();
        }

        let max = config.max_requests as usize;
        if timestamps.len() >= max {
            let oldest = timestamps.front().copied().unwrap_or(now_ms);
            let wait_ms = (oldest + window_ms - now_ms).max(1);
            let retry_after_secs = u64::try_from(wait_ms).unwrap_or(1).div_ceil(1000);
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after_secs: Some(retry_after_secs.max(1)),
            };
        }

        timestamps.push_back(now_ms);
        RateLimitDecision {
            allowed: true,
            remaining: (max - timestamps.len()) as u32,
            retry_after_secs: None,
        }
    }

    /// Drop buckets with no timestamps inside `window`. Returns how many
    /// were removed.
    ///
    /// A bucket still referenced outside the map belongs to a check in
    /// flight and is kept; clones are only handed out under the map lock,
    /// so the count cannot grow while this runs.
    pub fn prune_idle(&self, window: Duration, now_ms: i64) -> usize {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        let mut buckets = lock(&self.buckets);
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            Arc::strong_count(bucket) > 1
                || lock(bucket)
                    .back()
                    .is_some_and(|&newest| now_ms - newest < window_ms)
        });
        before - buckets.len()
    }

    pub fn tracked_keys(&self) -> usize {
        lock(&self.buckets).len()
    }

    fn bucket(&self, key: &str) -> Bucket {
        let mut buckets = lock(&self.buckets);
        buckets.entry(key.to_string()).or_default().clone()
    }
}

impl RateLimitStore for InMemoryRateLimiter {
    async fn check(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitDecision, RateLimitError> {
        Ok(self.check_at(key, config, now_ms()))
    }
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

// A panic while holding a bucket leaves plain timestamps behind; keep using them.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_n_plus_one_is_rejected() {
        let limiter = InMemoryRateLimiter::new();
        let config = RateLimitConfig::new(5, 900);

        for i in 0..5 {
            let d = limiter.check_at("auth:1.2.3.4", &config, T0 + i);
            assert!(d.allowed, "request {i} should pass");
            assert_eq!(d.remaining, 4 - i as u32);
        }

        let rejected = limiter.check_at("auth:1.2.3.4", &config, T0 + 10);
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.retry_after_secs, Some(900));
    }

    #[test]
    fn test_window_elapses() {
        let limiter = InMemoryRateLimiter::new();
        let config = RateLimitConfig::new(2, 60);

        assert!(limiter.check_at("k", &config, T0).allowed);
        assert!(limiter.check_at("k", &config, T0 + 30_000).allowed);
        assert!(!limiter.check_at("k", &config, T0 + 59_999).allowed);

        // First timestamp leaves the window exactly at T0 + 60s
        assert!(limiter.check_at("k", &config, T0 + 60_000).allowed);
        assert!(!limiter.check_at("k", &config, T0 + 60_001).allowed);
    }

    #[test]
    fn test_retry_after_uses_oldest_timestamp() {
        let limiter = InMemoryRateLimiter::new();
        let config = RateLimitConfig::new(1, 60);

        assert!(limiter.check_at("k", &config, T0).allowed);
        let d = limiter.check_at("k", &config, T0 + 45_500);
        assert!(!d.allowed);
        // 14.5s left, rounded up
        assert_eq!(d.retry_after_secs, Some(15));
    }

    #[test]
    fn test_rejections_are_not_counted() {
        let limiter = InMemoryRateLimiter::new();
        let config = RateLimitConfig::new(1, 10);

        assert!(limiter.check_at("k", &config, T0).allowed);
        for i in 1..20 {
            assert!(!limiter.check_at("k", &config, T0 + i * 100).allowed);
        }
        assert!(limiter.check_at("k", &config, T0 + 10_000).allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = InMemoryRateLimiter::new();
        let config = RateLimitConfig::new(1, 60);

        assert!(limiter.check_at("auth:a", &config, T0).allowed);
        assert!(!limiter.check_at("auth:a", &config, T0).allowed);
        assert!(limiter.check_at("auth:b", &config, T0).allowed);
        assert!(limiter.check_at("general:a", &config, T0).allowed);
    }

    #[test]
    fn test_policy_keys_and_limits() {
        assert_eq!(RateLimitPolicy::auth().key_for("10.0.0.1"), "auth:10.0.0.1");
        assert_eq!(RateLimitPolicy::auth().config, RateLimitConfig::new(5, 900));
        assert_eq!(RateLimitPolicy::general().config, RateLimitConfig::new(100, 60));
        assert_eq!(RateLimitPolicy::chat().config, RateLimitConfig::new(10, 60));
        assert_eq!(RateLimitPolicy::uploads().config, RateLimitConfig::new(5, 60));
    }

    #[test]
    fn test_prune_idle() {
        let limiter = InMemoryRateLimiter::new();
        let config = RateLimitConfig::new(3, 60);

        limiter.check_at("old", &config, T0);
        limiter.check_at("fresh", &config, T0 + 50_000);
        assert_eq!(limiter.tracked_keys(), 2);

        let removed = limiter.prune_idle(Duration::from_secs(60), T0 + 70_000);
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_prune_keeps_bucket_of_check_in_flight() {
        let limiter = InMemoryRateLimiter::new();
        let config = RateLimitConfig::new(2, 60);
        limiter.check_at("client", &config, T0);

        // A check has looked the bucket up but not yet locked it
        let in_flight = limiter.bucket("client");
        let removed = limiter.prune_idle(Duration::from_secs(60), T0 + 70_000);
        assert_eq!(removed, 0);

        lock(&in_flight).push_back(T0 + 70_000);
        drop(in_flight);

        limiter.check_at("client", &config, T0 + 70_001);
        let decision = limiter.check_at("client", &config, T0 + 70_002);
        assert!(!decision.allowed);
    }

    #[test]
    fn test_concurrent_burst_never_overcounts() {
        let limiter = Arc::new(InMemoryRateLimiter::new());
        let config = RateLimitConfig::new(50, 60);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..20)
                        .filter(|_| limiter.check_at("burst", &config, T0).allowed)
                        .count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 50);
    }

    #[tokio::test]
    async fn test_store_trait() {
        let limiter = InMemoryRateLimiter::new();
        let config = RateLimitConfig::new(1, 60);
        assert!(RateLimitStore::check(&limiter, "k", &config).await.unwrap().allowed);
        assert!(!RateLimitStore::check(&limiter, "k", &config).await.unwrap().allowed);
    }
}
