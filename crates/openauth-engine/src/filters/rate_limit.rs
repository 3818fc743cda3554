//! Rate limit filter: token bucket per filter name and caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use openauth_core::RateLimitFilterSpec;

use crate::error::RejectReason;
use crate::filters::FilterOutcome;
use crate::request::RequestView;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    const fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = elapsed.mul_add(refill_rate, self.tokens).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Bucket state shared by every route table generation.
///
/// Buckets are keyed by `(filter name, caller)`, so they outlive the table
/// that created them.
#[derive(Debug, Default)]
pub struct RateLimitStore {
    buckets: Mutex<HashMap<(String, String), TokenBucket>>,
}

impl RateLimitStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one token from the bucket for `(name, caller)`.
    pub fn try_acquire(&self, name: &str, caller: &str, burst: f64, rate: f64) -> bool {
        self.try_acquire_at(name, caller, burst, rate, Instant::now())
    }

    fn try_acquire_at(&self, name: &str, caller: &str, burst: f64, rate: f64, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();
        buckets
            .entry((name.to_string(), caller.to_string()))
            .or_insert_with(|| TokenBucket::new(burst, now))
            .try_acquire(burst, rate, now)
    }

    /// Drop buckets untouched for longer than `max_idle`. Returns how many were removed.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        self.prune_idle_at(max_idle, Instant::now())
    }

    fn prune_idle_at(&self, max_idle: Duration, now: Instant) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, b| now.saturating_duration_since(b.last_update) <= max_idle);
        before - buckets.len()
    }

    /// Number of live buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Whether no buckets exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Token-bucket limiter bound to a shared store.
#[derive(Debug, Clone)]
pub struct RateLimitFilter {
    name: String,
    rate: f64,
    burst: f64,
    store: Arc<RateLimitStore>,
}

impl RateLimitFilter {
    /// Build from a spec.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the name is empty or the
    /// rate or burst is zero.
    pub fn new(spec: &RateLimitFilterSpec, store: Arc<RateLimitStore>) -> Result<Self, String> {
        if spec.name.is_empty() {
            return Err("rate_limit name must not be empty".to_string());
        }
        if spec.requests_per_second == 0 || spec.burst == 0 {
            return Err("requests_per_second and burst must be positive".to_string());
        }

        Ok(Self {
            name: spec.name.clone(),
            rate: f64::from(spec.requests_per_second),
            burst: f64::from(spec.burst),
            store,
        })
    }

    /// Filter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Charge the caller one token.
    #[must_use]
    pub fn check(&self, req: &RequestView) -> FilterOutcome {
        let caller = req.caller();
        if self.store.try_acquire(&self.name, &caller, self.burst, self.rate) {
            debug!(filter = %self.name, caller = %caller, "Rate limit passed");
            FilterOutcome::Allow
        } else {
            warn!(filter = %self.name, caller = %caller, "Rate limit exceeded");
            FilterOutcome::Reject(RejectReason::RateLimited)
        }
    }
}
