//! History source contract and request/response types.
//!
//! A [`MonthlyBarSource`] turns one [`MonthlyBarsRequest`] into a
//! [`MonthlySeries`]. Adapters report problems as [`SourceError`]s whose
//! kind decides what the fetcher does next:
//!
//! | Kind | Retried | Fetcher outcome after retries |
//! |------|---------|-------------------------------|
//! | `Transport` | yes | `no_data` |
//! | `RateLimited` | yes | `no_data` |
//! | `CircuitOpen` | yes | `no_data` |
//! | `Malformed` | yes | `no_data` |
//! | `Empty` | yes | `no_data` |
//! | `NotFound` | no | `no_data` |
//! | `UnrecognizedPayload` | no | `provider_error` |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{Bar, TickerSymbol, ValidationError};

/// Look-back window for the monthly history request, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryWindow {
    days: u32,
}

impl HistoryWindow {
    pub const DEFAULT_DAYS: u32 = 800;

    pub fn days(days: u32) -> Result<Self, ValidationError> {
        if days == 0 {
            return Err(ValidationError::EmptyHistoryWindow);
        }
        Ok(Self { days })
    }

    pub const fn as_days(self) -> u32 {
        self.days
    }

    /// Provider range parameter, e.g. `800d`.
    pub fn range_param(self) -> String {
        format!("{}d", self.days)
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            days: Self::DEFAULT_DAYS,
        }
    }
}

/// Request for the monthly history of one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyBarsRequest {
    pub symbol: TickerSymbol,
    pub window: HistoryWindow,
}

impl MonthlyBarsRequest {
    pub fn new(symbol: TickerSymbol, window: HistoryWindow) -> Self {
        Self { symbol, window }
    }
}

/// Monthly bars for one ticker, ascending by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    pub symbol: TickerSymbol,
    pub bars: Vec<Bar>,
}

impl MonthlySeries {
    pub fn new(symbol: TickerSymbol, bars: Vec<Bar>) -> Self {
        Self { symbol, bars }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Transport,
    RateLimited,
    CircuitOpen,
    Malformed,
    Empty,
    NotFound,
    UnrecognizedPayload,
}

/// Structured error reported by history adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    fn with_kind(kind: SourceErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::Transport, message, true)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::RateLimited, message, true)
    }

    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::CircuitOpen, message, true)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::Malformed, message, true)
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::Empty, message, true)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::NotFound, message, false)
    }

    pub fn unrecognized_payload(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::UnrecognizedPayload, message, false)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::CircuitOpen => "source.circuit_open",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::Empty => "source.empty",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::UnrecognizedPayload => "source.unrecognized_payload",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Monthly history provider contract.
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// concurrent request stream of a screening run.
pub trait MonthlyBarSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch monthly bars for one ticker. One call is one attempt; retries
    /// belong to [`MonthlyBarFetcher`](crate::MonthlyBarFetcher).
    fn monthly_bars<'a>(
        &'a self,
        req: MonthlyBarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MonthlySeries, SourceError>> + Send + 'a>>;
}
