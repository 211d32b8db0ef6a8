use std::sync::Arc;

use camscan_core::{
    ExchangeSuffixes, ReqwestHttpClient, ScreenConfig, ScreenOutcome, Screener, TickerSymbol,
};

use crate::cli::{Cli, TickerArgs};
use crate::error::CliError;

use super::{history_source, retry_policy, CommandOutput, TickerView};

pub async fn run(
    cli: &Cli,
    args: &TickerArgs,
    http_client: Arc<ReqwestHttpClient>,
) -> Result<CommandOutput, CliError> {
    let suffixes = ExchangeSuffixes::new(&args.suffix, &args.recognized_suffixes)?;
    let symbol = TickerSymbol::with_suffix(&args.symbol, &suffixes)?;

    let config = ScreenConfig::default()
        .with_history_days(args.levels.history_days)?
        .with_retry(retry_policy(cli))
        .with_threshold_pct(args.levels.threshold)
        .with_multiplier(args.levels.multiplier)
        .with_as_of(args.levels.as_of);
    config.validate()?;

    let now = config.reference_time();
    let screener = Screener::new(Arc::new(history_source(cli, http_client)), config);
    let outcome = screener.evaluate_ticker(&symbol, now).await;

    Ok(CommandOutput::Ticker(view(outcome)))
}

fn view(outcome: ScreenOutcome) -> TickerView {
    let ticker = outcome.ticker().clone();
    let disposition = outcome.disposition();
    match outcome {
        ScreenOutcome::Included(result) | ScreenOutcome::Filtered(result) => TickerView {
            ticker,
            disposition,
            result: Some(result),
            failure: None,
        },
        ScreenOutcome::Failed(failure) => TickerView {
            ticker,
            disposition,
            result: None,
            failure: Some(failure),
        },
    }
}
