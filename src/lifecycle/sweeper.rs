//! Periodic reclamation of expired state.
//!
//! Sweeps only free memory. Expiry correctness never depends on them: the
//! cache checks liveness on read and rate-limit windows reset on access.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::cache::CacheStore;
use crate::observability::metrics;
use crate::security::RateLimiter;

/// State that can drop its expired entries.
pub trait Sweep: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Remove expired entries, returning how many were removed.
    fn sweep(&self) -> usize;
}

impl Sweep for CacheStore {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn sweep(&self) -> usize {
        CacheStore::sweep(self)
    }
}

impl Sweep for RateLimiter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn sweep(&self) -> usize {
        RateLimiter::sweep(self)
    }
}

/// Run `target.sweep()` every `period` until shutdown.
pub fn spawn_sweeper<S: Sweep>(
    target: Arc<S>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(sweeper = target.name(), interval_secs = period.as_secs(), "Sweeper starting");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = target.sweep();
                    if removed > 0 {
                        tracing::debug!(sweeper = target.name(), removed, "Swept expired entries");
                        metrics::record_swept(target.name(), removed);
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!(sweeper = target.name(), "Sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    })
}
