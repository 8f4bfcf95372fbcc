//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Relay rate limit for broker connections
pub const RELAY_RATE_LIMIT: u32 = 120; // Max 120 relayed frames per second

/// Per-connection rate limiter state
#[derive(Clone)]
pub struct RelayRateLimiter {
    limiter: Arc<Limiter>,
}

impl RelayRateLimiter {
    pub fn new(frames_per_second: u32) -> Self {
        Self {
            limiter: create_limiter(frames_per_second),
        }
    }

    /// Check if a frame may be relayed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for RelayRateLimiter {
    fn default() -> Self {
        Self::new(RELAY_RATE_LIMIT)
    }
}
