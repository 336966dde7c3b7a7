//! Fixed-window rate limiting per client and endpoint.
//!
//! Each `(client, endpoint)` pair owns a counter and a reset deadline. The
//! first request after the deadline opens a fresh window with `count = 1`.
//! A burst of up to `2 × limit` is possible across a window seam; that is
//! inherent to fixed windows.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::{EndpointLimit, RateLimitConfig};
use crate::observability::metrics;

/// Rate-limited endpoint families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Upload,
    Url,
    Health,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Upload => "upload",
            Endpoint::Url => "url",
            Endpoint::Health => "health",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Instant,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, never less than one.
    pub fn retry_after_secs(&self) -> u64 {
        let millis = self.reset_at.saturating_duration_since(Instant::now()).as_millis() as u64;
        millis.div_ceil(1000).max(1)
    }

    /// Window reset as a unix timestamp in seconds.
    pub fn reset_unix_secs(&self) -> u64 {
        let until = self.reset_at.saturating_duration_since(Instant::now());
        (SystemTime::now() + until)
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Shared admission control state.
pub struct RateLimiter {
    windows: DashMap<(String, Endpoint), Window>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    fn rule(&self, endpoint: Endpoint) -> EndpointLimit {
        match endpoint {
            Endpoint::Upload => self.config.upload,
            Endpoint::Url => self.config.url,
            Endpoint::Health => self.config.health,
        }
    }

    /// Check and, if admitted, count one request.
    ///
    /// The shard lock is held across read-compare-increment, so concurrent
    /// callers for the same key cannot both take the last slot.
    pub fn check(&self, client: &str, endpoint: Endpoint) -> RateLimitDecision {
        let rule = self.rule(endpoint);
        let now = Instant::now();

        if !self.config.enabled {
            return RateLimitDecision {
                allowed: true,
                limit: rule.limit,
                remaining: rule.limit,
                reset_at: now + rule.window(),
            };
        }

        let mut entry = self
            .windows
            .entry((client.to_string(), endpoint))
            .or_insert_with(|| Window {
                count: 0,
                reset_at: now + rule.window(),
            });
        let window = entry.value_mut();

        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + rule.window();
        }

        let allowed = window.count < rule.limit;
        if allowed {
            window.count += 1;
        }
        let decision = RateLimitDecision {
            allowed,
            limit: rule.limit,
            remaining: rule.limit.saturating_sub(window.count),
            reset_at: window.reset_at,
        };
        drop(entry);

        if !allowed {
            tracing::warn!(client = %client, endpoint = endpoint.as_str(), "Rate limit exceeded");
            metrics::record_rate_limited(endpoint.as_str());
        }
        decision
    }

    /// Drop windows whose deadline has passed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at > now);
        before.saturating_sub(self.windows.len())
    }

    /// Number of windows currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.config.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(limit: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            url: EndpointLimit { limit, window_secs },
            ..RateLimitConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_boundary_and_reset() {
        let limiter = limiter(3, 60);
        for expected_remaining in [2, 1, 0] {
            let d = limiter.check("1.2.3.4", Endpoint::Url);
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }
        let denied = limiter.check("1.2.3.4", Endpoint::Url);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_secs(), 60);

        tokio::time::advance(Duration::from_secs(60)).await;
        let fresh = limiter.check("1.2.3.4", Endpoint::Url);
        assert!(fresh.allowed);
        // Fresh window counts this request as the first.
        assert_eq!(fresh.remaining, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_rounds_up() {
        let limiter = limiter(1, 60);
        limiter.check("c", Endpoint::Url);
        tokio::time::advance(Duration::from_millis(59_500)).await;
        let denied = limiter.check("c", Endpoint::Url);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_secs(), 1);
    }

    #[test]
    fn test_keys_are_per_client_and_endpoint() {
        let limiter = limiter(1, 60);
        assert!(limiter.check("a", Endpoint::Url).allowed);
        assert!(!limiter.check("a", Endpoint::Url).allowed);
        assert!(limiter.check("b", Endpoint::Url).allowed);
        assert!(limiter.check("a", Endpoint::Upload).allowed);
    }

    #[test]
    fn test_denial_does_not_consume() {
        let limiter = limiter(2, 60);
        limiter.check("a", Endpoint::Url);
        limiter.check("a", Endpoint::Url);
        for _ in 0..5 {
            assert!(!limiter.check("a", Endpoint::Url).allowed);
        }
        assert_eq!(limiter.windows.get(&("a".to_string(), Endpoint::Url)).unwrap().count, 2);
    }

    #[test]
    fn test_disabled_admits_everything() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            url: EndpointLimit::per_minute(1),
            ..RateLimitConfig::default()
        });
        for _ in 0..10 {
            assert!(limiter.check("a", Endpoint::Url).allowed);
        }
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn test_concurrent_admission_is_exact() {
        let limiter = Arc::new(limiter(50, 60));
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.check("same", Endpoint::Url).allowed)
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(admitted, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired_windows() {
        let limiter = limiter(5, 60);
        limiter.check("old", Endpoint::Url);
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.check("new", Endpoint::Url);
        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked(), 1);
        assert!(limiter.windows.contains_key(&("new".to_string(), Endpoint::Url)));
    }
}
