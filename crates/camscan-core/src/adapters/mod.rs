//! History provider adapters.

pub mod yahoo;

pub use yahoo::{YahooChartSource, IST_OFFSET_SECONDS, YAHOO_CHART_URL};
