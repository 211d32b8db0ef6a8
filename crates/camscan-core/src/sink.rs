//! CSV persistence of a screening report.
//!
//! One row per started ticker: included results first (ranked), then
//! filtered results, then failures in universe order. Prices are rounded to
//! two decimals; failure rows leave every numeric field empty.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use time::Date;

use crate::pipeline::{PivotResult, ScreenFailure, ScreenReport};
use crate::pivot::round_to;
use crate::format_iso_date;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode report row: {0}")]
    Csv(#[from] csv::Error),
}

/// `nifty500_monthly_camarilla_YYYYMMDD.csv` for the given run date.
pub fn default_file_name(run_date: Date) -> String {
    format!(
        "nifty500_monthly_camarilla_{:04}{:02}{:02}.csv",
        run_date.year(),
        u8::from(run_date.month()),
        run_date.day()
    )
}

#[derive(Debug, Serialize)]
struct SinkRow<'a> {
    ticker: &'a str,
    year_month: Option<String>,
    period_end: Option<String>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    r3: Option<f64>,
    s3: Option<f64>,
    percent_range: Option<f64>,
    latest_close: Option<f64>,
    status: &'a str,
    error: &'a str,
}

impl<'a> SinkRow<'a> {
    fn result(result: &'a PivotResult, status: &'a str) -> Self {
        let price = |value: f64| Some(round_to(value, 2));
        Self {
            ticker: result.ticker.as_str(),
            year_month: Some(result.year_month.to_string()),
            period_end: Some(format_iso_date(result.period_end)),
            open: price(result.open),
            high: price(result.high),
            low: price(result.low),
            close: price(result.close),
            r3: price(result.r3),
            s3: price(result.s3),
            percent_range: price(result.percent_range),
            latest_close: price(result.latest_close),
            status,
            error: "",
        }
    }

    fn failure(failure: &'a ScreenFailure) -> Self {
        Self {
            ticker: failure.ticker.as_str(),
            year_month: None,
            period_end: None,
            open: None,
            high: None,
            low: None,
            close: None,
            r3: None,
            s3: None,
            percent_range: None,
            latest_close: None,
            status: failure.reason.as_str(),
            error: &failure.detail,
        }
    }
}

/// Write the report as CSV; returns the number of data rows.
pub fn write_report<W: Write>(report: &ScreenReport, writer: W) -> Result<usize, SinkError> {
    let mut out = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for result in &report.ranked {
        out.serialize(SinkRow::result(result, "included"))?;
        rows += 1;
    }
    for result in &report.filtered {
        out.serialize(SinkRow::result(result, "filtered"))?;
        rows += 1;
    }
    for failure in &report.failures {
        out.serialize(SinkRow::failure(failure))?;
        rows += 1;
    }

    out.flush()?;
    Ok(rows)
}

pub fn write_report_file(report: &ScreenReport, path: &Path) -> Result<usize, SinkError> {
    let file = File::create(path)?;
    write_report(report, file)
}
