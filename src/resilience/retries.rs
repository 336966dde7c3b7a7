//! Retry logic for upstream calls.
//!
//! # Design Decisions
//! - Only transient failures (network, 5xx or status-less generic) are retried
//! - Auth, quota and timeout failures return immediately
//! - Jittered backoff prevents thundering herd

use std::future::Future;
use std::time::Duration;

use crate::analysis::UpstreamError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Pause after failed attempt `attempt` (1-based): the base doubled per
    /// attempt, capped at the maximum, plus up to 10% jitter.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let capped = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(capped + fastrand::u64(0..=capped / 10))
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<F, Fut, T>(&self, name: &str, mut operation: F) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && e.is_transient() => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        operation = name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying upstream call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::UpstreamKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 10,
            max_delay_ms: 100,
        }
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let policy = policy(5);
        let ms = |attempt| policy.delay_after(attempt).as_millis() as u64;
        assert!((10..=11).contains(&ms(1)));
        assert!((20..=22).contains(&ms(2)));
        assert!((40..=44).contains(&ms(3)));
        assert!((100..=110).contains(&ms(8)));
        assert!((100..=110).contains(&ms(200)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let calls = &AtomicU32::new(0);
        let result = policy(3)
            .run("op", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(UpstreamError::new(UpstreamKind::Network, "reset"))
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = policy(2)
            .run("op", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(UpstreamError::new(UpstreamKind::Generic, "502"))
            })
            .await;
        assert_eq!(result.unwrap_err().kind, UpstreamKind::Generic);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failures_not_retried() {
        for kind in [UpstreamKind::AuthConfig, UpstreamKind::Quota, UpstreamKind::Timeout] {
            let calls = &AtomicU32::new(0);
            let result: Result<(), _> = policy(5)
                .run("op", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(UpstreamError::new(kind, "x"))
                })
                .await;
            assert_eq!(result.unwrap_err().kind, kind);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = policy(5)
            .run("op", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(UpstreamError::new(UpstreamKind::Generic, "bad request").with_status(400))
            })
            .await;
        assert_eq!(result.unwrap_err().status, Some(400));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
