//! CLI argument definitions for camscan.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `screen` | Screen the universe and write the CSV report |
//! | `universe` | Resolve and list the ticker universe |
//! | `ticker` | Levels for one ticker's last completed month |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `table` | Output format (table, json, ndjson) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | `10000` | Per-request history timeout |
//! | `--retries` | `2` | Retries after a failed history request |
//! | `--backoff-ms` | `1000` | Linear backoff base between retries |
//! | `--log-level` | `info` | Base level when `RUST_LOG` is unset |
//!
//! # Examples
//!
//! ```bash
//! camscan screen --limit 20 --out sample.csv
//! camscan screen --symbols RELIANCE,TCS.BO --no-csv --format json --pretty
//! camscan ticker INFY --as-of 2024-06-15
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use camscan_core::{UtcDateTime, DEFAULT_MULTIPLIER, DEFAULT_THRESHOLD_PCT, NIFTY500_CSV_URL};

/// Monthly Camarilla pivot screener for NSE/BSE equities.
#[derive(Debug, Parser)]
#[command(
    name = "camscan",
    author,
    version,
    about = "Monthly Camarilla pivot screener",
    long_about = "camscan resolves an index constituent list, fetches monthly candles per \
ticker, computes Camarilla R3/S3 from the last completed month and ranks tickers \
whose R3-S3 band is narrower than a threshold.\n\
\n\
Logs go to stderr; set RUST_LOG to override the filter."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// History request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Retries after a failed history request.
    #[arg(long, global = true, default_value_t = 2)]
    pub retries: u32,

    /// Linear backoff base in milliseconds (retry n waits n x base).
    #[arg(long, global = true, default_value_t = 1_000)]
    pub backoff_ms: u64,

    /// Base log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table for terminal display.
    Table,
    /// Single JSON document.
    Json,
    /// One JSON object per line.
    Ndjson,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Screen the universe and write the CSV report.
    ///
    /// # Examples
    ///
    ///   camscan screen
    ///   camscan screen --limit 20 --pause-ms 500 --out sample.csv
    ///   camscan screen --concurrency 4 --threshold 5
    Screen(ScreenArgs),

    /// Resolve the constituent list and print the ticker universe.
    Universe(UniverseArgs),

    /// Compute levels for a single ticker.
    ///
    /// # Examples
    ///
    ///   camscan ticker RELIANCE
    ///   camscan ticker TCS.BO --multiplier 1.0
    Ticker(TickerArgs),
}

/// Where the ticker universe comes from.
#[derive(Debug, Clone, Args)]
pub struct UniverseArgs {
    /// Constituent list URL (CSV with a symbol/ticker/code column).
    #[arg(long, default_value = NIFTY500_CSV_URL)]
    pub universe_url: String,

    /// Explicit comma-separated symbols; skips the constituent download.
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Suffix appended to bare symbols.
    #[arg(long, default_value = ".NS")]
    pub suffix: String,

    /// Additional suffixes accepted as-is (the default suffix always is).
    #[arg(long, value_delimiter = ',', default_value = ".BO")]
    pub recognized_suffixes: Vec<String>,

    /// Process only the first N tickers.
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Level computation settings shared by `screen` and `ticker`.
#[derive(Debug, Clone, Args)]
pub struct LevelArgs {
    /// History window in days.
    #[arg(long, default_value_t = 800)]
    pub history_days: u32,

    /// Percent-range ceiling; tickers at or above it are filtered out.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_PCT)]
    pub threshold: f64,

    /// Camarilla expansion multiplier.
    #[arg(long, default_value_t = DEFAULT_MULTIPLIER)]
    pub multiplier: f64,

    /// Reference date for "current month" (YYYY-MM-DD or RFC3339 UTC).
    #[arg(long, value_parser = parse_as_of)]
    pub as_of: Option<UtcDateTime>,
}

#[derive(Debug, Clone, Args)]
pub struct ScreenArgs {
    #[command(flatten)]
    pub universe: UniverseArgs,

    #[command(flatten)]
    pub levels: LevelArgs,

    /// Pause between history requests in milliseconds.
    #[arg(long, default_value_t = 350)]
    pub pause_ms: u64,

    /// Tickers fetched in parallel.
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// CSV output path (default: nifty500_monthly_camarilla_YYYYMMDD.csv).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Do not write the CSV report.
    #[arg(long, default_value_t = false, conflicts_with = "out")]
    pub no_csv: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TickerArgs {
    /// Symbol, with or without exchange suffix.
    pub symbol: String,

    /// Suffix appended when the symbol has none.
    #[arg(long, default_value = ".NS")]
    pub suffix: String,

    /// Additional suffixes accepted as-is (the default suffix always is).
    #[arg(long, value_delimiter = ',', default_value = ".BO")]
    pub recognized_suffixes: Vec<String>,

    #[command(flatten)]
    pub levels: LevelArgs,
}

fn parse_as_of(raw: &str) -> Result<UtcDateTime, String> {
    UtcDateTime::parse(raw).map_err(|error| error.to_string())
}
