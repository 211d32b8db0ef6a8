use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::data_source::{
    HistoryWindow, MonthlyBarSource, MonthlyBarsRequest, MonthlySeries, SourceError,
    SourceErrorKind,
};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::TickerSymbol;

/// Why a ticker's history could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// No usable bars: the provider reported none, or transient failures
    /// outlasted the retry budget.
    NoData {
        attempts: u32,
        last_error: SourceError,
    },
    /// The provider answered with content in no known shape.
    ProviderError { error: SourceError },
}

impl FetchFailure {
    pub fn source_error(&self) -> &SourceError {
        match self {
            Self::NoData { last_error, .. } => last_error,
            Self::ProviderError { error } => error,
        }
    }
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoData {
                attempts,
                last_error,
            } => write!(f, "no data after {attempts} attempt(s): {last_error}"),
            Self::ProviderError { error } => write!(f, "provider error: {error}"),
        }
    }
}

impl std::error::Error for FetchFailure {}

/// Retrying wrapper around a [`MonthlyBarSource`].
///
/// Transient errors and empty series are retried up to
/// [`RetryPolicy::max_retries`] times, sleeping `delay_for_retry(n)` before
/// retry `n`. The fetcher never panics and never returns a partial series.
#[derive(Clone)]
pub struct MonthlyBarFetcher {
    source: Arc<dyn MonthlyBarSource>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl MonthlyBarFetcher {
    pub fn new(source: Arc<dyn MonthlyBarSource>, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub async fn fetch(
        &self,
        symbol: &TickerSymbol,
        window: HistoryWindow,
    ) -> Result<MonthlySeries, FetchFailure> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                %symbol,
                attempt,
                max_attempts,
                source = self.source.name(),
                "fetching monthly bars"
            );

            let request = MonthlyBarsRequest::new(symbol.clone(), window);
            let error = match self.source.monthly_bars(request).await {
                Ok(series) if !series.is_empty() => return Ok(series),
                Ok(_) => SourceError::empty(format!("no monthly bars for {symbol}")),
                Err(error) => error,
            };

            match error.kind() {
                SourceErrorKind::NotFound => {
                    debug!(%symbol, %error, "provider reports no data");
                    return Err(FetchFailure::NoData {
                        attempts: attempt,
                        last_error: error,
                    });
                }
                SourceErrorKind::UnrecognizedPayload => {
                    warn!(%symbol, %error, "unrecognized history payload");
                    return Err(FetchFailure::ProviderError { error });
                }
                _ if !error.retryable() || attempt >= max_attempts => {
                    warn!(%symbol, attempts = attempt, %error, "giving up on ticker history");
                    return Err(FetchFailure::NoData {
                        attempts: attempt,
                        last_error: error,
                    });
                }
                _ => {
                    let delay = self.policy.delay_for_retry(attempt);
                    warn!(
                        %symbol,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "retrying ticker history"
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }
}
