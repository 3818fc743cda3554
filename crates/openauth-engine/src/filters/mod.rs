//! Filters run before a route's terminal handler.
//!
//! A route's filters execute in declared order. Each sees the request and the
//! data collected so far, and either allows the request to continue or
//! rejects it, which stops the chain.

mod condition;
mod rate_limit;
mod request;

use std::sync::Arc;
use std::time::Duration;

use openauth_core::FilterSpec;

use crate::error::{ControlError, RejectReason};
use crate::request::{FilterContext, RequestView};

pub use condition::ConditionFilter;
pub use rate_limit::{RateLimitFilter, RateLimitStore};
pub use request::{RequestFilter, ALLOW_FIELD};

/// Result of running one filter.
#[derive(Debug)]
pub enum FilterOutcome {
    /// Continue with the next filter.
    Allow,
    /// Stop the chain.
    Reject(RejectReason),
}

impl FilterOutcome {
    /// Whether the request may continue.
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Resources filters are bound to at compile time.
///
/// The environment outlives every table generation: the HTTP client pool
/// and rate-limit buckets are reused across swaps.
#[derive(Debug, Clone)]
pub struct FilterEnvironment {
    client: reqwest::Client,
    timeout: Duration,
    rate_limits: Arc<RateLimitStore>,
}

impl FilterEnvironment {
    /// Create an environment whose request filters time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Internal` if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self, ControlError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ControlError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout,
            rate_limits: Arc::new(RateLimitStore::new()),
        })
    }

    /// Shared HTTP client.
    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Per-call timeout for request filters.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Shared rate-limit buckets.
    #[must_use]
    pub fn rate_limits(&self) -> &Arc<RateLimitStore> {
        &self.rate_limits
    }
}

/// A compiled filter.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Remote validation.
    Request(RequestFilter),
    /// Metadata comparison.
    Condition(ConditionFilter),
    /// Token bucket.
    RateLimit(RateLimitFilter),
}

impl Filter {
    /// Compile a filter declaration. Unnamed filters are called `<kind>#<index>`.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the declaration is malformed.
    pub fn build(spec: &FilterSpec, index: usize, env: &FilterEnvironment) -> Result<Self, String> {
        let name = spec
            .name()
            .map_or_else(|| format!("{}#{index}", spec.kind()), str::to_string);

        match spec {
            FilterSpec::Request(s) => RequestFilter::new(name, s, env).map(Self::Request),
            FilterSpec::Condition(s) => ConditionFilter::new(name, s).map(Self::Condition),
            FilterSpec::RateLimit(s) => {
                RateLimitFilter::new(s, Arc::clone(env.rate_limits())).map(Self::RateLimit)
            }
        }
    }

    /// Kind tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Condition(_) => "condition",
            Self::RateLimit(_) => "rate_limit",
        }
    }

    /// Filter name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Request(f) => f.name(),
            Self::Condition(f) => f.name(),
            Self::RateLimit(f) => f.name(),
        }
    }

    /// Run the filter.
    pub async fn process(&self, req: &RequestView, ctx: &mut FilterContext) -> FilterOutcome {
        match self {
            Self::Request(f) => f.process(req, ctx).await,
            Self::Condition(f) => f.evaluate(req),
            Self::RateLimit(f) => f.check(req),
        }
    }
}
