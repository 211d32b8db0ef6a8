use std::io::{self, Write};

use serde::Serialize;
use serde_json::{json, Value};

use camscan_core::{round_to, PivotResult, ScreenReport};

use crate::cli::OutputFormat;
use crate::commands::{CommandOutput, TickerView};
use crate::error::CliError;

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            let document = document(output)?;
            let payload = if pretty {
                serde_json::to_string_pretty(&document)?
            } else {
                serde_json::to_string(&document)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Ndjson => {
            for record in records(output)? {
                writeln!(out, "{}", serde_json::to_string(&record)?)?;
            }
        }
        OutputFormat::Table => render_table(&mut out, output)?,
    }

    Ok(())
}

fn document(output: &CommandOutput) -> Result<Value, CliError> {
    let value = match output {
        CommandOutput::Report { report, csv_path } => {
            let mut value = serde_json::to_value(report)?;
            if let (Some(path), Value::Object(map)) = (csv_path, &mut value) {
                map.insert(String::from("csv_path"), json!(path.display().to_string()));
            }
            value
        }
        CommandOutput::Universe(symbols) => json!({ "count": symbols.len(), "symbols": symbols }),
        CommandOutput::Ticker(view) => serde_json::to_value(view)?,
    };
    Ok(value)
}

/// One object per ticker, then a trailing summary for reports.
fn records(output: &CommandOutput) -> Result<Vec<Value>, CliError> {
    let mut records = Vec::new();
    match output {
        CommandOutput::Report { report, .. } => {
            for result in &report.ranked {
                records.push(tagged(result, "included")?);
            }
            for result in &report.filtered {
                records.push(tagged(result, "filtered")?);
            }
            for failure in &report.failures {
                records.push(tagged(failure, failure.reason.as_str())?);
            }
            records.push(json!({
                "status": "summary",
                "summary": report.summary,
                "cancelled": report.cancelled,
            }));
        }
        CommandOutput::Universe(symbols) => {
            records.extend(symbols.iter().map(|symbol| json!({ "ticker": symbol })));
        }
        CommandOutput::Ticker(view) => records.push(serde_json::to_value(view)?),
    }
    Ok(records)
}

fn tagged<T: Serialize>(record: &T, status: &str) -> Result<Value, CliError> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value {
        map.insert(String::from("status"), json!(status));
    }
    Ok(value)
}

fn render_table(out: &mut impl Write, output: &CommandOutput) -> Result<(), CliError> {
    match output {
        CommandOutput::Report { report, csv_path } => {
            render_report(out, report)?;
            if let Some(path) = csv_path {
                writeln!(out, "csv         : {}", path.display())?;
            }
        }
        CommandOutput::Universe(symbols) => {
            writeln!(out, "count       : {}", symbols.len())?;
            for symbol in symbols {
                writeln!(out, "  {symbol}")?;
            }
        }
        CommandOutput::Ticker(view) => render_ticker(out, view)?,
    }
    Ok(())
}

fn render_report(out: &mut impl Write, report: &ScreenReport) -> Result<(), CliError> {
    writeln!(out, "as_of       : {}", report.as_of)?;
    writeln!(out, "threshold   : {:.2}%", report.threshold_pct)?;

    let summary = &report.summary;
    writeln!(
        out,
        "summary     : universe={} included={} filtered={} no_data={} no_completed_month={} provider_error={} division_undefined={} skipped={}",
        summary.universe,
        summary.included,
        summary.filtered,
        summary.no_data,
        summary.no_completed_month,
        summary.provider_error,
        summary.division_undefined,
        summary.skipped,
    )?;
    if report.cancelled {
        writeln!(out, "cancelled   : true")?;
    }

    if report.ranked.is_empty() {
        writeln!(out, "ranked      : none")?;
    } else {
        writeln!(out, "ranked:")?;
        writeln!(out, "{}", header())?;
        for result in &report.ranked {
            writeln!(out, "{}", row(result))?;
        }
    }

    if !report.failures.is_empty() {
        writeln!(out, "failures:")?;
        for failure in &report.failures {
            writeln!(out, "  - {}: {} ({})", failure.ticker, failure.reason, failure.detail)?;
        }
    }
    Ok(())
}

fn render_ticker(out: &mut impl Write, view: &TickerView) -> Result<(), CliError> {
    writeln!(out, "ticker      : {}", view.ticker)?;
    writeln!(out, "disposition : {}", view.disposition)?;
    if let Some(result) = &view.result {
        writeln!(out, "{}", header())?;
        writeln!(out, "{}", row(result))?;
        writeln!(out, "pivot       : {:.2}", round_to(result.central_pivot, 2))?;
    }
    if let Some(failure) = &view.failure {
        writeln!(out, "error       : {}", failure.detail)?;
    }
    Ok(())
}

fn header() -> String {
    format!(
        "  {:<16} {:<8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8} {:>10}",
        "TICKER", "MONTH", "OPEN", "HIGH", "LOW", "CLOSE", "R3", "S3", "RANGE%", "LATEST"
    )
}

fn row(result: &PivotResult) -> String {
    format!(
        "  {:<16} {:<8} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>8.2} {:>10.2}",
        result.ticker.as_str(),
        result.year_month.to_string(),
        result.open,
        result.high,
        result.low,
        result.close,
        result.r3,
        result.s3,
        result.percent_range,
        result.latest_close,
    )
}
