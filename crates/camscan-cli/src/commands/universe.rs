use std::sync::Arc;

use tracing::info;

use camscan_core::{ReqwestHttpClient, TickerSymbol, UniverseSource};

use crate::cli::UniverseArgs;
use crate::error::CliError;

use super::{suffixes, CommandOutput};

pub async fn run(
    args: &UniverseArgs,
    http_client: Arc<ReqwestHttpClient>,
) -> Result<CommandOutput, CliError> {
    let symbols = resolve(args, http_client).await?;
    Ok(CommandOutput::Universe(symbols))
}

/// Explicit `--symbols` win over the remote list; `--limit` applies to both.
pub(super) async fn resolve(
    args: &UniverseArgs,
    http_client: Arc<ReqwestHttpClient>,
) -> Result<Vec<TickerSymbol>, CliError> {
    let suffixes = suffixes(args)?;

    let mut symbols = if args.symbols.is_empty() {
        UniverseSource::with_http_client(http_client)
            .with_url(args.universe_url.as_str())
            .with_suffixes(suffixes)
            .resolve()
            .await?
    } else {
        let mut symbols = Vec::with_capacity(args.symbols.len());
        for raw in &args.symbols {
            let symbol = TickerSymbol::with_suffix(raw, &suffixes)?;
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        info!(count = symbols.len(), "using symbols from the command line");
        symbols
    };

    if let Some(limit) = args.limit {
        symbols.truncate(limit);
    }
    Ok(symbols)
}
