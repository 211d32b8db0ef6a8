use thiserror::Error;

/// Validation and contract errors exposed by `camscan-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter or digit: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },
    #[error("symbol '{value}' has no exchange suffix")]
    MissingExchangeSuffix { value: String },
    #[error("exchange suffix must look like '.NS': '{value}'")]
    InvalidExchangeSuffix { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z) or YYYY-MM-DD: '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },
    #[error("year-month must match YYYY-MM: '{value}'")]
    InvalidYearMonth { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("bar high must be >= low")]
    InvalidBarRange,

    #[error("history window must be at least one day")]
    EmptyHistoryWindow,
    #[error("setting '{field}' must be a positive finite number")]
    InvalidSetting { field: &'static str },
}

/// Run-level failure of a screening pass.
///
/// Only an unreachable or unparseable universe aborts a run; per-ticker
/// problems are reported as outcomes instead.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("universe source unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ScreenError {
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }
}
