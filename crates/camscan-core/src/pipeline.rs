//! Screening pipeline: fetch, select, compute, filter, rank.
//!
//! Every ticker ends in exactly one [`ScreenOutcome`]. Per-ticker problems
//! never abort the run; only an invalid [`ScreenConfig`] does.
//!
//! Tickers start in universe order. With `concurrency = 1` the run is
//! strictly sequential; with `N > 1` up to `N` tickers are in flight on a
//! [`JoinSet`] while a shared [`RequestGate`] keeps the request pacing.
//! Results are written to per-ticker slots and ranked after collection, so
//! the report does not depend on completion order.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use time::Date;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::ScreenConfig;
use crate::data_source::MonthlyBarSource;
use crate::error::ScreenError;
use crate::fetcher::{FetchFailure, MonthlyBarFetcher};
use crate::period::select_last_completed;
use crate::pivot::compute;
use crate::retry::Sleeper;
use crate::throttling::RequestGate;
use crate::{format_iso_date, Bar, TickerSymbol, UtcDateTime, YearMonth};

/// Typed reason a ticker produced no pivot result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoData,
    NoCompletedMonth,
    ProviderError,
    DivisionUndefined,
}

impl FailureReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::NoCompletedMonth => "no_completed_month",
            Self::ProviderError => "provider_error",
            Self::DivisionUndefined => "division_undefined",
        }
    }
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pivot levels derived from one completed monthly bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotResult {
    pub ticker: TickerSymbol,
    pub year_month: YearMonth,
    #[serde(serialize_with = "serialize_date")]
    pub period_end: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub r3: f64,
    pub s3: f64,
    pub central_pivot: f64,
    pub percent_range: f64,
    /// Close of the newest fetched bar, possibly the in-progress month.
    pub latest_close: f64,
}

fn serialize_date<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_iso_date(*date))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenFailure {
    pub ticker: TickerSymbol,
    pub reason: FailureReason,
    pub detail: String,
}

impl ScreenFailure {
    fn new(ticker: TickerSymbol, reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            ticker,
            reason,
            detail: detail.into(),
        }
    }
}

/// Final disposition of one ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenOutcome {
    /// Below the threshold; part of the ranked output.
    Included(PivotResult),
    /// Computed, but at or above the threshold.
    Filtered(PivotResult),
    Failed(ScreenFailure),
}

impl ScreenOutcome {
    pub fn ticker(&self) -> &TickerSymbol {
        match self {
            Self::Included(result) | Self::Filtered(result) => &result.ticker,
            Self::Failed(failure) => &failure.ticker,
        }
    }

    pub fn disposition(&self) -> &'static str {
        match self {
            Self::Included(_) => "included",
            Self::Filtered(_) => "filtered",
            Self::Failed(failure) => failure.reason.as_str(),
        }
    }
}

/// Per-disposition ticker counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScreenSummary {
    pub universe: usize,
    pub included: usize,
    pub filtered: usize,
    pub no_data: usize,
    pub no_completed_month: usize,
    pub provider_error: usize,
    pub division_undefined: usize,
    pub skipped: usize,
}

impl ScreenSummary {
    fn record(&mut self, outcome: &ScreenOutcome) {
        match outcome {
            ScreenOutcome::Included(_) => self.included += 1,
            ScreenOutcome::Filtered(_) => self.filtered += 1,
            ScreenOutcome::Failed(failure) => match failure.reason {
                FailureReason::NoData => self.no_data += 1,
                FailureReason::NoCompletedMonth => self.no_completed_month += 1,
                FailureReason::ProviderError => self.provider_error += 1,
                FailureReason::DivisionUndefined => self.division_undefined += 1,
            },
        }
    }
}

/// Result of one screening run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenReport {
    pub as_of: UtcDateTime,
    pub threshold_pct: f64,
    /// Included results, ascending by percent range then ticker.
    pub ranked: Vec<PivotResult>,
    /// Results at or above the threshold, in the same order.
    pub filtered: Vec<PivotResult>,
    /// Failures in universe order.
    pub failures: Vec<ScreenFailure>,
    pub summary: ScreenSummary,
    pub cancelled: bool,
}

/// Cooperative stop signal shared with a running screen.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Strict upper bound: a range exactly at the threshold is excluded.
pub fn passes_threshold(percent_range: f64, threshold_pct: f64) -> bool {
    percent_range < threshold_pct
}

/// Sort ascending by percent range, ties broken by ticker.
pub fn rank(results: &mut [PivotResult]) {
    results.sort_by(|a, b| {
        a.percent_range
            .total_cmp(&b.percent_range)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
}

/// Turn one ticker's history into its outcome. Pure; no I/O.
pub fn evaluate(
    ticker: &TickerSymbol,
    bars: &[Bar],
    now: UtcDateTime,
    multiplier: f64,
    threshold_pct: f64,
) -> ScreenOutcome {
    let bar = match select_last_completed(bars, now) {
        Ok(bar) => bar,
        Err(error) => {
            return ScreenOutcome::Failed(ScreenFailure::new(
                ticker.clone(),
                FailureReason::NoCompletedMonth,
                error.to_string(),
            ))
        }
    };

    let levels = compute(bar.high, bar.low, bar.close, multiplier);
    let Some(percent_range) = levels.percent_range else {
        return ScreenOutcome::Failed(ScreenFailure::new(
            ticker.clone(),
            FailureReason::DivisionUndefined,
            format!("S3 is zero for {}", bar.month),
        ));
    };

    let result = PivotResult {
        ticker: ticker.clone(),
        year_month: bar.month,
        period_end: bar.month.last_day(),
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        r3: levels.r3,
        s3: levels.s3,
        central_pivot: levels.central_pivot,
        percent_range,
        latest_close: bars.last().map_or(bar.close, |latest| latest.close),
    };

    if passes_threshold(percent_range, threshold_pct) {
        ScreenOutcome::Included(result)
    } else {
        ScreenOutcome::Filtered(result)
    }
}

fn fetch_failure_outcome(ticker: &TickerSymbol, failure: FetchFailure) -> ScreenOutcome {
    let reason = match failure {
        FetchFailure::NoData { .. } => FailureReason::NoData,
        FetchFailure::ProviderError { .. } => FailureReason::ProviderError,
    };
    ScreenOutcome::Failed(ScreenFailure::new(
        ticker.clone(),
        reason,
        failure.to_string(),
    ))
}

/// Runs the pipeline for a universe against one history source.
#[derive(Clone)]
pub struct Screener {
    fetcher: MonthlyBarFetcher,
    config: ScreenConfig,
    cancel: CancellationFlag,
}

impl Screener {
    pub fn new(source: Arc<dyn MonthlyBarSource>, config: ScreenConfig) -> Self {
        Self {
            fetcher: MonthlyBarFetcher::new(source, config.retry),
            config,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.fetcher = self.fetcher.with_sleeper(sleeper);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Fetch, select and compute a single ticker.
    pub async fn evaluate_ticker(&self, ticker: &TickerSymbol, now: UtcDateTime) -> ScreenOutcome {
        process(&self.fetcher, ticker, now, &self.config).await
    }

    pub async fn screen(&self, universe: &[TickerSymbol]) -> Result<ScreenReport, ScreenError> {
        self.config.validate()?;

        let now = self.config.reference_time();
        let tickers = prepare_universe(universe, self.config.max_tickers);
        let streams = self.config.concurrency;
        info!(
            tickers = tickers.len(),
            streams,
            source = self.fetcher.source_name(),
            as_of = %now,
            "starting screen"
        );

        let gate = RequestGate::new(self.config.pause, streams);
        let permits = Arc::new(Semaphore::new(streams));
        let mut slots: Vec<Option<ScreenOutcome>> = vec![None; tickers.len()];
        let mut tasks = JoinSet::new();
        let mut started = 0;

        for (index, ticker) in tickers.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            if self.cancel.is_cancelled() {
                break;
            }
            gate.wait().await;

            let fetcher = self.fetcher.clone();
            let config = self.config.clone();
            let ticker = ticker.clone();
            tasks.spawn(async move {
                let outcome = process(&fetcher, &ticker, now, &config).await;
                drop(permit);
                (index, outcome)
            });
            started = index + 1;
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(error) => warn!(%error, "screen task failed"),
            }
        }

        let cancelled = started < tickers.len();
        if cancelled {
            warn!(
                started,
                skipped = tickers.len() - started,
                "screen cancelled before all tickers started"
            );
        }

        let mut summary = ScreenSummary {
            universe: tickers.len(),
            skipped: tickers.len() - started,
            ..ScreenSummary::default()
        };
        let mut ranked = Vec::new();
        let mut filtered = Vec::new();
        let mut failures = Vec::new();

        for (ticker, slot) in tickers.iter().zip(slots).take(started) {
            let outcome = slot.unwrap_or_else(|| {
                ScreenOutcome::Failed(ScreenFailure::new(
                    ticker.clone(),
                    FailureReason::ProviderError,
                    "screen task aborted",
                ))
            });
            summary.record(&outcome);
            match outcome {
                ScreenOutcome::Included(result) => ranked.push(result),
                ScreenOutcome::Filtered(result) => filtered.push(result),
                ScreenOutcome::Failed(failure) => failures.push(failure),
            }
        }

        rank(&mut ranked);
        rank(&mut filtered);

        info!(
            included = summary.included,
            filtered = summary.filtered,
            no_data = summary.no_data,
            no_completed_month = summary.no_completed_month,
            provider_error = summary.provider_error,
            division_undefined = summary.division_undefined,
            skipped = summary.skipped,
            "screen finished"
        );

        Ok(ScreenReport {
            as_of: now,
            threshold_pct: self.config.threshold_pct,
            ranked,
            filtered,
            failures,
            summary,
            cancelled,
        })
    }
}

async fn process(
    fetcher: &MonthlyBarFetcher,
    ticker: &TickerSymbol,
    now: UtcDateTime,
    config: &ScreenConfig,
) -> ScreenOutcome {
    let outcome = match fetcher.fetch(ticker, config.history).await {
        Ok(series) => evaluate(
            ticker,
            &series.bars,
            now,
            config.multiplier,
            config.threshold_pct,
        ),
        Err(failure) => fetch_failure_outcome(ticker, failure),
    };
    debug!(%ticker, disposition = outcome.disposition(), "ticker screened");
    outcome
}

fn prepare_universe(universe: &[TickerSymbol], max_tickers: Option<usize>) -> Vec<TickerSymbol> {
    let mut seen = HashSet::new();
    universe
        .iter()
        .filter(|ticker| seen.insert(*ticker))
        .take(max_tickers.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

/// Screen `universe` against `source` with `config`.
pub async fn screen(
    universe: &[TickerSymbol],
    source: Arc<dyn MonthlyBarSource>,
    config: ScreenConfig,
) -> Result<ScreenReport, ScreenError> {
    Screener::new(source, config).screen(universe).await
}
