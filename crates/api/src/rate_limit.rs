//! Keyed request rate limiting (GCRA via `governor`).
//!
//! - auth endpoints: keyed by client address, applied as a route layer
//! - post creation: keyed by tenant and author, checked in the handler after
//!   authorization

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::app::errors::ApiError;
use crate::config::RateLimit;

/// Past this many tracked keys, idle keys are dropped on the next check.
const MAX_TRACKED_KEYS: usize = 10_000;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

pub struct Limiter {
    name: &'static str,
    clock: DefaultClock,
    inner: Option<KeyedLimiter>,
}

impl Limiter {
    pub fn new(name: &'static str, limit: RateLimit) -> Self {
        let clock = DefaultClock::default();
        let inner = quota(limit).map(|q| RateLimiter::new(q, DefaultKeyedStateStore::default(), &clock));
        Self { name, clock, inner }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Take one request slot for `key`, or fail with `RateLimited`.
    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        let Some(limiter) = &self.inner else {
            return Ok(());
        };
        if limiter.len() > MAX_TRACKED_KEYS {
            limiter.retain_recent();
        }

        limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            tracing::info!(limiter = self.name, key, retry_after_ms = wait.as_millis() as u64, "rate limited");
            ApiError::RateLimited {
                retry_after_secs: wait.as_secs().max(1),
            }
        })
    }
}

impl core::fmt::Debug for Limiter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Limiter")
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

/// `max_requests` spread evenly over `window`, all of them usable at once.
fn quota(limit: RateLimit) -> Option<Quota> {
    let burst = NonZeroU32::new(limit.max_requests)?;
    let period = limit.window.checked_div(limit.max_requests)?;
    Quota::with_period(period).map(|q| q.allow_burst(burst))
}

/// Route layer: limit by the connecting client's address.
pub async fn limit_by_client(State(limiter): State<Arc<Limiter>>, req: Request, next: Next) -> Result<Response, ApiError> {
    limiter.check(&client_key(&req))?;
    Ok(next.run(req).await)
}

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
