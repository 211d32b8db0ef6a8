use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

/// Observable breaker state for the history provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Thresholds and cool-down for the history provider breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive upstream failures that open the breaker.
    pub failure_threshold: u32,
    /// How long an open breaker rejects calls before allowing one trial call.
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed,
    Open { since: Instant },
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    consecutive_failures: u32,
}

/// Shared breaker guarding calls to one upstream host. While open, calls
/// fail fast without touching the network.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                phase: Phase::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    /// Whether a call may go upstream now. An expired open breaker lets a
    /// single trial call through and moves to half-open.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        match inner.phase {
            Phase::Closed | Phase::HalfOpen => true,
            Phase::Open { since } if since.elapsed() >= self.config.open_timeout => {
                inner.phase = Phase::HalfOpen;
                true
            }
            Phase::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.phase = Phase::Closed;
        inner.consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let trips = matches!(inner.phase, Phase::HalfOpen)
            || inner.consecutive_failures >= self.config.failure_threshold;
        if trips && !matches!(inner.phase, Phase::Open { .. }) {
            warn!(
                failures = inner.consecutive_failures,
                cool_down_ms = self.config.open_timeout.as_millis() as u64,
                "history provider circuit opened"
            );
        }
        if trips {
            inner.phase = Phase::Open {
                since: Instant::now(),
            };
        }
    }

    pub fn state(&self) -> CircuitState {
        match self.lock().phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen => CircuitState::HalfOpen,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .expect("circuit breaker lock is not poisoned")
    }
}
