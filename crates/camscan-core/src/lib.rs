//! # camscan Core
//!
//! Monthly Camarilla pivot screening for exchange-listed equities.
//!
//! ## Overview
//!
//! The crate resolves a ticker universe from an index constituent list,
//! fetches monthly OHLC history per ticker, selects the last completed
//! calendar month, computes Camarilla R3/S3 levels and ranks tickers by the
//! relative width of that band.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | History provider adapters (Yahoo v8 chart) |
//! | [`circuit_breaker`] | Circuit breaker for the history provider |
//! | [`config`] | Run settings and documented defaults |
//! | [`data_source`] | History source trait, requests and structured errors |
//! | [`domain`] | Ticker symbols, bars, calendar months, timestamps |
//! | [`error`] | Validation and run-level errors |
//! | [`fetcher`] | Retrying monthly bar fetcher |
//! | [`http_client`] | HTTP client abstraction |
//! | [`payload`] | Detection and parsing of history payload shapes |
//! | [`period`] | Last-completed-month selection |
//! | [`pipeline`] | Screening pipeline, outcomes and ranking |
//! | [`pivot`] | Camarilla level arithmetic |
//! | [`retry`] | Retry policy and sleep seam |
//! | [`sink`] | CSV persistence |
//! | [`throttling`] | Request pacing |
//! | [`universe`] | Constituent list resolution |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use camscan_core::{screen, ScreenConfig, UniverseSource, YahooChartSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let universe = UniverseSource::default().resolve().await?;
//!     let report = screen(
//!         &universe,
//!         Arc::new(YahooChartSource::default()),
//!         ScreenConfig::default().with_max_tickers(Some(20)),
//!     )
//!     .await?;
//!
//!     for result in &report.ranked {
//!         println!("{} {:.2}%", result.ticker, result.percent_range);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Universe Source  │  constituent CSV -> TickerSymbol list
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Screener         │────▶│ Request Gate     │
//! │ (JoinSet)        │     └──────────────────┘
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Monthly Bar      │────▶│ Circuit Breaker  │
//! │ Fetcher (retry)  │     │ + HTTP Client    │
//! └────────┬─────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Period Selector  │
//! │ + Pivot Levels   │
//! └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Only [`ScreenError`] aborts a run. Per-ticker problems surface as
//! [`ScreenOutcome::Failed`] with a [`FailureReason`]:
//!
//! ```rust
//! use camscan_core::{FailureReason, ScreenReport};
//!
//! fn unreachable_tickers(report: &ScreenReport) -> usize {
//!     report
//!         .failures
//!         .iter()
//!         .filter(|failure| failure.reason == FailureReason::NoData)
//!         .count()
//! }
//! ```

pub mod adapters;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod payload;
pub mod period;
pub mod pipeline;
pub mod pivot;
pub mod retry;
pub mod sink;
pub mod throttling;
pub mod universe;

// Adapter implementations
pub use adapters::{YahooChartSource, IST_OFFSET_SECONDS, YAHOO_CHART_URL};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Configuration
pub use config::{ScreenConfig, DEFAULT_PAUSE, DEFAULT_THRESHOLD_PCT};

// History source trait and types
pub use data_source::{
    HistoryWindow, MonthlyBarSource, MonthlyBarsRequest, MonthlySeries, SourceError,
    SourceErrorKind,
};

// Domain models
pub use domain::{format_iso_date, Bar, ExchangeSuffixes, TickerSymbol, UtcDateTime, YearMonth};

// Error types
pub use error::{ScreenError, ValidationError};

// Fetching
pub use fetcher::{FetchFailure, MonthlyBarFetcher};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, BROWSER_USER_AGENT,
};

// Payload shapes
pub use payload::{parse_monthly_bars, parse_monthly_bars_at, MonthlyPayload, PayloadShape};

// Selection and levels
pub use period::{select_last_completed, NoCompletedPeriod};
pub use pivot::{compute, round_to, CamarillaLevels, DEFAULT_MULTIPLIER};

// Pipeline
pub use pipeline::{
    evaluate, passes_threshold, rank, screen, CancellationFlag, FailureReason, PivotResult,
    ScreenFailure, ScreenOutcome, ScreenReport, ScreenSummary, Screener,
};

// Retry logic
pub use retry::{Backoff, RetryPolicy, SimulatedSleeper, Sleeper, TokioSleeper};

// Persistence
pub use sink::{default_file_name, write_report, write_report_file, SinkError};

// Throttling
pub use throttling::RequestGate;

// Universe
pub use universe::{resolve_symbols, UniverseSource, NIFTY500_CSV_URL};
