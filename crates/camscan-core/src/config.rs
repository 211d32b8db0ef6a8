use std::time::Duration;

use crate::data_source::HistoryWindow;
use crate::pivot::DEFAULT_MULTIPLIER;
use crate::retry::RetryPolicy;
use crate::{UtcDateTime, ValidationError};

/// Default percent-range ceiling; results at or above it are filtered out.
pub const DEFAULT_THRESHOLD_PCT: f64 = 6.5;
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(350);

/// Settings for one screening run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    pub history: HistoryWindow,
    /// Truncate the universe to its first N tickers.
    pub max_tickers: Option<usize>,
    /// Minimum spacing between history requests of one stream.
    pub pause: Duration,
    pub retry: RetryPolicy,
    pub threshold_pct: f64,
    pub multiplier: f64,
    /// Tickers in flight at once; 1 is strictly sequential.
    pub concurrency: usize,
    /// Reference instant for "current month"; `None` uses the wall clock.
    pub as_of: Option<UtcDateTime>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            history: HistoryWindow::default(),
            max_tickers: None,
            pause: DEFAULT_PAUSE,
            retry: RetryPolicy::default(),
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            multiplier: DEFAULT_MULTIPLIER,
            concurrency: 1,
            as_of: None,
        }
    }
}

impl ScreenConfig {
    pub fn with_history_days(mut self, days: u32) -> Result<Self, ValidationError> {
        self.history = HistoryWindow::days(days)?;
        Ok(self)
    }

    pub fn with_max_tickers(mut self, max_tickers: Option<usize>) -> Self {
        self.max_tickers = max_tickers;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_threshold_pct(mut self, threshold_pct: f64) -> Self {
        self.threshold_pct = threshold_pct;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_as_of(mut self, as_of: Option<UtcDateTime>) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.threshold_pct.is_finite() || self.threshold_pct <= 0.0 {
            return Err(ValidationError::InvalidSetting {
                field: "threshold_pct",
            });
        }
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(ValidationError::InvalidSetting { field: "multiplier" });
        }
        if self.concurrency == 0 {
            return Err(ValidationError::InvalidSetting {
                field: "concurrency",
            });
        }
        Ok(())
    }

    /// Reference instant for period selection.
    pub fn reference_time(&self) -> UtcDateTime {
        self.as_of.unwrap_or_else(UtcDateTime::now)
    }
}
