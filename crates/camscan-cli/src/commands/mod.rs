mod screen;
mod ticker;
mod universe;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use camscan_core::{
    ExchangeSuffixes, PivotResult, ReqwestHttpClient, RetryPolicy, ScreenFailure, ScreenReport,
    TickerSymbol, YahooChartSource,
};

use crate::cli::{Cli, Command, UniverseArgs};
use crate::error::CliError;

/// What a command produced, ready for rendering.
#[derive(Debug)]
pub enum CommandOutput {
    Report {
        report: ScreenReport,
        csv_path: Option<PathBuf>,
    },
    Universe(Vec<TickerSymbol>),
    Ticker(TickerView),
}

impl CommandOutput {
    /// Exit status once the output has been rendered.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Report { report, .. } if report.cancelled => ExitCode::from(130),
            Self::Ticker(view) if view.failure.is_some() => ExitCode::from(3),
            _ => ExitCode::SUCCESS,
        }
    }
}

/// Single-ticker result.
#[derive(Debug, Serialize)]
pub struct TickerView {
    pub ticker: TickerSymbol,
    pub disposition: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PivotResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ScreenFailure>,
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    let http_client = Arc::new(ReqwestHttpClient::default());

    match &cli.command {
        Command::Screen(args) => screen::run(cli, args, http_client).await,
        Command::Universe(args) => universe::run(args, http_client).await,
        Command::Ticker(args) => ticker::run(cli, args, http_client).await,
    }
}

fn retry_policy(cli: &Cli) -> RetryPolicy {
    RetryPolicy::linear(cli.retries, Duration::from_millis(cli.backoff_ms))
}

fn history_source(cli: &Cli, http_client: Arc<ReqwestHttpClient>) -> YahooChartSource {
    YahooChartSource::with_http_client(http_client).with_timeout_ms(cli.timeout_ms)
}

fn suffixes(args: &UniverseArgs) -> Result<ExchangeSuffixes, CliError> {
    Ok(ExchangeSuffixes::new(
        &args.suffix,
        &args.recognized_suffixes,
    )?)
}
