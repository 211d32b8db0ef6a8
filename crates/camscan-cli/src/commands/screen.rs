use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{info, warn};

use camscan_core::{
    default_file_name, write_report_file, ReqwestHttpClient, ScreenConfig, Screener,
};

use crate::cli::{Cli, ScreenArgs};
use crate::error::CliError;

use super::{history_source, retry_policy, universe, CommandOutput};

pub async fn run(
    cli: &Cli,
    args: &ScreenArgs,
    http_client: Arc<ReqwestHttpClient>,
) -> Result<CommandOutput, CliError> {
    let config = ScreenConfig::default()
        .with_history_days(args.levels.history_days)?
        .with_max_tickers(args.universe.limit)
        .with_pause(Duration::from_millis(args.pause_ms))
        .with_retry(retry_policy(cli))
        .with_threshold_pct(args.levels.threshold)
        .with_multiplier(args.levels.multiplier)
        .with_concurrency(args.concurrency)
        .with_as_of(args.levels.as_of);
    config.validate()?;

    let symbols = universe::resolve(&args.universe, http_client.clone()).await?;
    if symbols.is_empty() {
        return Err(CliError::Command(String::from(
            "ticker universe is empty",
        )));
    }

    let screener = Screener::new(Arc::new(history_source(cli, http_client)), config);
    let cancel = screener.cancellation();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing tickers in flight");
            cancel.cancel();
        }
    });

    let report = screener.screen(&symbols).await;
    interrupt.abort();
    let report = report?;

    let csv_path = if args.no_csv {
        None
    } else {
        let path = output_path(args.out.as_deref(), OffsetDateTime::now_utc());
        let rows = write_report_file(&report, &path)?;
        info!(path = %path.display(), rows, "wrote screen report");
        Some(path)
    };

    Ok(CommandOutput::Report { report, csv_path })
}

fn output_path(out: Option<&Path>, run_time: OffsetDateTime) -> PathBuf {
    out.map_or_else(
        || PathBuf::from(default_file_name(run_time.date())),
        Path::to_path_buf,
    )
}
