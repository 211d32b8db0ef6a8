use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Pacing gate in front of per-ticker history requests.
///
/// N request streams share one limiter that replenishes a permit every
/// `pause / N` and holds at most N, so the aggregate rate is N requests per
/// `pause` and each stream averages one `pause` between its own requests.
/// A zero pause disables pacing.
#[derive(Clone)]
pub struct RequestGate {
    limiter: Option<Arc<DirectRateLimiter>>,
    pause: Duration,
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate")
            .field("pause", &self.pause)
            .field("limited", &self.is_limited())
            .finish()
    }
}

impl RequestGate {
    pub fn new(pause: Duration, streams: usize) -> Self {
        let limiter = quota_for(pause, streams).map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self { limiter, pause }
    }

    pub fn unlimited() -> Self {
        Self {
            limiter: None,
            pause: Duration::ZERO,
        }
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Non-blocking check used by diagnostics and tests.
    pub fn try_acquire(&self) -> bool {
        self.limiter
            .as_ref()
            .map_or(true, |limiter| limiter.check().is_ok())
    }

    /// Wait until the next request may be sent.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

fn quota_for(pause: Duration, streams: usize) -> Option<Quota> {
    if pause.is_zero() {
        return None;
    }
    let burst = u32::try_from(streams.max(1))
        .ok()
        .and_then(NonZeroU32::new)
        .unwrap_or(NonZeroU32::MIN);
    Quota::with_period(pause / burst.get()).map(|quota| quota.allow_burst(burst))
}
