//! # Domain Models
//!
//! Canonical domain types for camscan.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TickerSymbol`] | Exchange-suffixed, uppercase ticker |
//! | [`ExchangeSuffixes`] | Default and recognized exchange suffixes |
//! | [`Bar`] | Monthly OHLC bar keyed by calendar month |
//! | [`YearMonth`] | Calendar month key (`YYYY-MM`) |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Construction validates invariants: symbols are normalized and suffixed,
//! bars hold finite prices with `high >= low`.

mod models;
mod month;
mod symbol;
mod timestamp;

pub use models::Bar;
pub use month::{format_iso_date, YearMonth};
pub(crate) use month::parse_iso_date;
pub use symbol::{ExchangeSuffixes, TickerSymbol};
pub use timestamp::UtcDateTime;
