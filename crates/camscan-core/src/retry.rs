//! Bounded retry policy and the sleep seam used between attempts.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

/// Delay strategy applied between fetch attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Same delay before every retry.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Delay grows with the retry index: `base * retry`.
    Linear {
        /// Delay before the first retry.
        base: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            base: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (1-based: the first retry is 1).
    pub fn delay(self, retry: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay } => delay,
            Self::Linear { base } => base.saturating_mul(retry.max(1)),
        }
    }
}

/// How often a failed fetch is retried and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn linear(max_retries: u32, base: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Linear { base },
        }
    }

    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::None,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }

    /// Sum of every backoff delay a fully failing fetch would wait.
    pub fn worst_case_backoff(&self) -> Duration {
        (1..=self.max_retries).fold(Duration::ZERO, |total, retry| {
            total.saturating_add(self.delay_for_retry(retry))
        })
    }
}

/// Sleep seam so retry timing can be driven by a simulated clock in tests.
pub trait Sleeper: Send + Sync {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Real sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
        })
    }
}

/// Simulated clock: records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct SimulatedSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl SimulatedSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .expect("simulated clock lock is not poisoned")
            .clone()
    }

    /// Total simulated time spent sleeping.
    pub fn elapsed(&self) -> Duration {
        self.delays().into_iter().sum()
    }
}

impl Sleeper for SimulatedSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        self.delays
            .lock()
            .expect("simulated clock lock is not poisoned")
            .push(duration);
        Box::pin(async {})
    }
}
