//! Monthly history payload shapes.
//!
//! Providers answer a history request in one of a small, closed set of
//! shapes. [`MonthlyPayload::detect`] inspects the body once and picks the
//! matching variant; each variant has its own parser and all of them yield
//! the same ascending [`Bar`] sequence for the same data.
//!
//! | Shape | Recognized by |
//! |-------|---------------|
//! | [`PayloadShape::ChartArrays`] | JSON object with a `chart` key (`timestamp[]` plus parallel OHLC arrays) |
//! | [`PayloadShape::ColumnarJson`] | JSON object with `columns` and `data` (split-oriented table) |
//! | [`PayloadShape::ColumnarCsv`] | text whose header row names a date and a close column |
//!
//! # Lenient parsing
//!
//! Rows without a close are dropped: a bar is unusable without one. Missing
//! open, high or low values are read as `0.0`, matching the tolerance of the
//! upstream calculator; the `high >= low` check only applies when both came
//! from the payload (see [`Bar::lenient`]).
//!
//! # Exchange months
//!
//! Epoch timestamps are instants, so their calendar month depends on the
//! exchange. Chart payloads carry their own `gmtoffset`; columnar epochs use
//! the exchange offset handed to [`MonthlyPayload::into_bars_at`]. Date
//! strings already name a local date and are taken as written.

use serde::Deserialize;
use serde_json::Value;
use time::{OffsetDateTime, UtcOffset};
use tracing::debug;

use crate::data_source::SourceError;
use crate::domain::parse_iso_date;
use crate::{Bar, UtcDateTime, YearMonth};

/// Payload shapes understood by the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    ChartArrays,
    ColumnarJson,
    ColumnarCsv,
}

impl PayloadShape {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChartArrays => "chart_arrays",
            Self::ColumnarJson => "columnar_json",
            Self::ColumnarCsv => "columnar_csv",
        }
    }
}

/// A history response body classified by shape.
#[derive(Debug, Clone)]
pub enum MonthlyPayload {
    ChartArrays(ChartEnvelope),
    ColumnarJson(ColumnarTable),
    ColumnarCsv(String),
}

impl MonthlyPayload {
    /// Classify a raw response body.
    ///
    /// Empty bodies, invalid JSON and HTML pages (served by throttling
    /// proxies) are transient and retryable; well-formed content in any
    /// other shape is an [`unrecognized_payload`](SourceError::unrecognized_payload).
    pub fn detect(body: &str) -> Result<Self, SourceError> {
        let trimmed = body.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            return Err(SourceError::empty("history payload is empty"));
        }

        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            let value: Value = serde_json::from_str(trimmed)
                .map_err(|e| SourceError::malformed(format!("invalid history JSON: {e}")))?;
            return Self::from_json(value);
        }

        if trimmed.starts_with('<') {
            return Err(SourceError::malformed(
                "history endpoint returned markup instead of data",
            ));
        }

        let header = trimmed.lines().next().unwrap_or_default().to_ascii_lowercase();
        let columns = header.split(',').map(str::trim).collect::<Vec<_>>();
        let has_date = columns.iter().any(|c| is_date_column(c));
        let has_close = columns.iter().any(|c| is_close_column(c));
        if has_date && has_close {
            return Ok(Self::ColumnarCsv(trimmed.to_owned()));
        }

        Err(SourceError::unrecognized_payload(
            "history payload is neither JSON nor a dated CSV table",
        ))
    }

    fn from_json(value: Value) -> Result<Self, SourceError> {
        let Value::Object(map) = &value else {
            return Err(SourceError::unrecognized_payload(
                "history JSON is not an object",
            ));
        };

        if map.contains_key("chart") {
            let envelope = serde_json::from_value(value)
                .map_err(|e| SourceError::malformed(format!("invalid chart payload: {e}")))?;
            return Ok(Self::ChartArrays(envelope));
        }

        if map.contains_key("columns") && map.contains_key("data") {
            let table = serde_json::from_value(value)
                .map_err(|e| SourceError::malformed(format!("invalid columnar payload: {e}")))?;
            return Ok(Self::ColumnarJson(table));
        }

        let keys = map.keys().take(5).cloned().collect::<Vec<_>>().join(",");
        Err(SourceError::unrecognized_payload(format!(
            "history JSON has no chart or columnar keys (found: {keys})"
        )))
    }

    pub fn shape(&self) -> PayloadShape {
        match self {
            Self::ChartArrays(_) => PayloadShape::ChartArrays,
            Self::ColumnarJson(_) => PayloadShape::ColumnarJson,
            Self::ColumnarCsv(_) => PayloadShape::ColumnarCsv,
        }
    }

    /// Parse into bars sorted ascending by timestamp, reading epoch
    /// timestamps in UTC.
    pub fn into_bars(self) -> Result<Vec<Bar>, SourceError> {
        self.into_bars_at(UtcOffset::UTC)
    }

    /// Parse into bars, assigning epoch timestamps to the calendar month
    /// they fall in at `exchange_offset`. A chart `gmtoffset` takes
    /// precedence.
    pub fn into_bars_at(self, exchange_offset: UtcOffset) -> Result<Vec<Bar>, SourceError> {
        let rows = match self {
            Self::ChartArrays(envelope) => chart_rows(envelope, exchange_offset)?,
            Self::ColumnarJson(table) => columnar_json_rows(table, exchange_offset)?,
            Self::ColumnarCsv(text) => columnar_csv_rows(&text, exchange_offset)?,
        };
        Ok(assemble(rows))
    }
}

/// Detect and parse in one step, reading epoch timestamps in UTC.
pub fn parse_monthly_bars(body: &str) -> Result<Vec<Bar>, SourceError> {
    MonthlyPayload::detect(body)?.into_bars()
}

/// Detect and parse in one step for an exchange at `exchange_offset`.
pub fn parse_monthly_bars_at(body: &str, exchange_offset: UtcOffset) -> Result<Vec<Bar>, SourceError> {
    MonthlyPayload::detect(body)?.into_bars_at(exchange_offset)
}

// ============================================================================
// Chart arrays (Yahoo v8 chart)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChartMeta {
    #[serde(rename = "gmtoffset", default)]
    gmt_offset: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn chart_rows(envelope: ChartEnvelope, exchange_offset: UtcOffset) -> Result<Vec<RawRow>, SourceError> {
    let ChartBody { result, error } = envelope.chart;

    if let Some(error) = error.filter(|value| !value.is_null()) {
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string());
        return Err(SourceError::not_found(format!("chart error: {description}")));
    }

    let result = result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::empty("chart payload has no result"))?;

    let timestamps = result.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Err(SourceError::empty("chart payload has no timestamps"));
    }

    let offset = result
        .meta
        .and_then(|meta| meta.gmt_offset)
        .and_then(|seconds| UtcOffset::from_whole_seconds(seconds).ok())
        .unwrap_or(exchange_offset);

    let quote = result
        .indicators
        .and_then(|indicators| indicators.quote.into_iter().next())
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(timestamps.len());
    for (index, &seconds) in timestamps.iter().enumerate() {
        let Some((ts, month)) = epoch_period(seconds, offset) else {
            debug!(seconds, "skipping chart row with out-of-range timestamp");
            continue;
        };
        rows.push(RawRow {
            ts,
            month,
            open: cell(&quote.open, index),
            high: cell(&quote.high, index),
            low: cell(&quote.low, index),
            close: cell(&quote.close, index),
            volume: cell(&quote.volume, index),
        });
    }

    Ok(rows)
}

fn cell(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

// ============================================================================
// Columnar JSON (split-oriented table)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnarTable {
    columns: Vec<String>,
    #[serde(default)]
    index: Vec<Value>,
    data: Vec<Vec<Value>>,
}

fn columnar_json_rows(
    table: ColumnarTable,
    exchange_offset: UtcOffset,
) -> Result<Vec<RawRow>, SourceError> {
    let layout = ColumnLayout::locate(table.columns.iter().map(String::as_str))?;
    if layout.date.is_none() && table.index.len() < table.data.len() {
        return Err(SourceError::unrecognized_payload(
            "columnar payload has neither a date column nor a full index",
        ));
    }

    let mut rows = Vec::with_capacity(table.data.len());
    for (position, record) in table.data.iter().enumerate() {
        let period = match layout.date {
            Some(column) => record.get(column),
            None => table.index.get(position),
        };
        let Some((ts, month)) = period.and_then(|value| json_period(value, exchange_offset)) else {
            debug!(position, "skipping columnar row without a readable date");
            continue;
        };
        let number = |column: Option<usize>| column.and_then(|c| record.get(c)).and_then(json_number);

        rows.push(RawRow {
            ts,
            month,
            open: number(layout.open),
            high: number(layout.high),
            low: number(layout.low),
            close: number(Some(layout.close)),
            volume: number(layout.volume),
        });
    }

    Ok(rows)
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text_number(text),
        _ => None,
    }
}

fn json_period(value: &Value, exchange_offset: UtcOffset) -> Option<(UtcDateTime, YearMonth)> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .and_then(|raw| epoch_period(normalize_epoch(raw), exchange_offset)),
        Value::String(text) => text_period(text, exchange_offset),
        _ => None,
    }
}

/// Epoch values above 10^11 are milliseconds (pandas' default JSON encoding).
fn normalize_epoch(raw: i64) -> i64 {
    if raw.abs() >= 100_000_000_000 {
        raw / 1_000
    } else {
        raw
    }
}

/// Instant and exchange-local month of an epoch in seconds.
fn epoch_period(seconds: i64, offset: UtcOffset) -> Option<(UtcDateTime, YearMonth)> {
    let ts = UtcDateTime::from_unix_timestamp(seconds).ok()?;
    let month = ts.year_month_at(offset)?;
    Some((ts, month))
}

// ============================================================================
// Columnar CSV
// ============================================================================

fn columnar_csv_rows(text: &str, exchange_offset: UtcOffset) -> Result<Vec<RawRow>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::malformed(format!("invalid CSV header: {e}")))?
        .clone();
    let layout = ColumnLayout::locate(headers.iter())?;
    let date_column = layout.date.ok_or_else(|| {
        SourceError::unrecognized_payload("CSV history payload has no date column")
    })?;

    let mut rows = Vec::new();
    for (position, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| SourceError::malformed(format!("invalid CSV row {position}: {e}")))?;
        let Some((ts, month)) = record
            .get(date_column)
            .and_then(|text| text_period(text, exchange_offset))
        else {
            debug!(position, "skipping CSV row without a readable date");
            continue;
        };
        let number = |column: Option<usize>| column.and_then(|c| record.get(c)).and_then(text_number);

        rows.push(RawRow {
            ts,
            month,
            open: number(layout.open),
            high: number(layout.high),
            low: number(layout.low),
            close: number(Some(layout.close)),
            volume: number(layout.volume),
        });
    }

    Ok(rows)
}

// ============================================================================
// Shared helpers
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    date: Option<usize>,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

impl ColumnLayout {
    fn locate<'a>(names: impl Iterator<Item = &'a str>) -> Result<Self, SourceError> {
        let names = names
            .map(|name| name.trim().to_ascii_lowercase())
            .collect::<Vec<_>>();
        let find = |wanted: &str| names.iter().position(|name| name == wanted);

        let close = names
            .iter()
            .position(|name| is_close_column(name))
            .ok_or_else(|| SourceError::unrecognized_payload("history table has no close column"))?;

        Ok(Self {
            date: names.iter().position(|name| is_date_column(name)),
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close,
            volume: find("volume"),
        })
    }
}

fn is_date_column(name: &str) -> bool {
    matches!(name, "date" | "datetime" | "timestamp" | "period")
}

fn is_close_column(name: &str) -> bool {
    name == "close"
}

fn text_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn text_period(text: &str, exchange_offset: UtcOffset) -> Option<(UtcDateTime, YearMonth)> {
    let trimmed = text.trim();
    if let Ok(raw) = trimmed.parse::<i64>() {
        return epoch_period(normalize_epoch(raw), exchange_offset);
    }
    let ts = text_timestamp(trimmed)?;
    Some((ts, ts.year_month()))
}

fn text_timestamp(trimmed: &str) -> Option<UtcDateTime> {
    if let Ok(ts) = UtcDateTime::parse(trimmed) {
        return Some(ts);
    }
    // Offset timestamps such as 2024-05-01T00:00:00+05:30 keep their local date.
    if let Ok(parsed) =
        OffsetDateTime::parse(trimmed, &time::format_description::well_known::Rfc3339)
    {
        return Some(UtcDateTime::from_date(parsed.date()));
    }
    parse_iso_date(trimmed).map(UtcDateTime::from_date)
}

/// One parsed row before the lenient-parsing policy is applied.
#[derive(Debug, Clone, Copy)]
struct RawRow {
    ts: UtcDateTime,
    month: YearMonth,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

fn assemble(rows: Vec<RawRow>) -> Vec<Bar> {
    let mut bars = rows
        .into_iter()
        .filter_map(|row| {
            let close = row.close.filter(|value| value.is_finite())?;
            let volume = row
                .volume
                .filter(|value| value.is_finite() && *value >= 0.0)
                .map(|value| value as u64);
            Bar::lenient(row.ts, row.month, row.open, row.high, row.low, close, volume)
            .map_err(|error| debug!(ts = %row.ts, %error, "dropping invalid bar"))
            .ok()
        })
        .collect::<Vec<_>>();

    bars.sort_by_key(|bar| bar.ts);
    bars
}
