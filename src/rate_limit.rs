use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::worker::BackgroundTask;

// Outcome of a single rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    // Seconds until the next request can be admitted, 0 when allowed
    pub retry_after_secs: u64,
}

// Sliding window limiter, one hit log per key.
// A hit exactly `window` old no longer counts.
pub struct RateLimiter {
    hits: DashMap<String, VecDeque<Instant>>, // key -> admitted request times, oldest first
    limit: usize,                             // max requests per window
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            hits: DashMap::new(),
            limit: limit.max(1) as usize,
            window,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.decide(key, Instant::now)
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        self.decide(key, || now)
    }

    // Prune, compare and record happen while the entry's shard lock is held,
    // so concurrent requests for one key cannot both slip past the limit.
    // The clock is read under the same lock, which keeps each log sorted.
    fn decide(&self, key: &str, clock: impl FnOnce() -> Instant) -> RateDecision {
        let mut entry = self.hits.entry(key.to_string()).or_default();
        let now = clock();
        let log = entry.value_mut();

        while let Some(&oldest) = log.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() < self.limit {
            log.push_back(now);
            return RateDecision {
                allowed: true,
                retry_after_secs: 0,
            };
        }

        // Full window: wait until the oldest hit leaves it
        let retry_after = match log.front() {
            Some(&oldest) => self.window - now.saturating_duration_since(oldest),
            None => self.window,
        };
        RateDecision {
            allowed: false,
            retry_after_secs: ceil_secs(retry_after).max(1),
        }
    }

    // Drop keys with no hit left inside the window
    pub fn purge_idle(&self, now: Instant) -> usize {
        let before = self.hits.len();
        self.hits.retain(|_, log| match log.back() {
            Some(&newest) => now.saturating_duration_since(newest) < self.window,
            None => false,
        });
        before.saturating_sub(self.hits.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.hits.len()
    }

    pub fn start_sweeper(self: &Arc<Self>, every: Duration) -> BackgroundTask {
        let limiter = Arc::clone(self);
        BackgroundTask::spawn("rate-limit-sweeper", every, move || {
            let limiter = Arc::clone(&limiter);
            async move {
                let purged = limiter.purge_idle(Instant::now());
                if purged > 0 {
                    tracing::debug!(purged, "purged idle rate limit entries");
                }
            }
        })
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
