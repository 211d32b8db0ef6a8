//! Ticker universe resolution from an index constituent list.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ScreenError;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient, BROWSER_USER_AGENT};
use crate::{ExchangeSuffixes, TickerSymbol};

/// Published NIFTY 500 constituent list.
pub const NIFTY500_CSV_URL: &str =
    "https://www.niftyindices.com/IndexConstituent/ind_nifty500list.csv";

const SYMBOL_HEADERS: [&str; 3] = ["symbol", "ticker", "code"];

/// Resolve constituent CSV text into a deduplicated, exchange-suffixed
/// universe.
///
/// The symbol column is the first header containing `symbol`, `ticker` or
/// `code` (case-insensitive); without one the first column is used. Values
/// are trimmed and uppercased, blanks and `NAN` are skipped, and bare codes
/// get the default exchange suffix. First-seen order is preserved.
pub fn resolve_symbols(
    text: &str,
    suffixes: &ExchangeSuffixes,
) -> Result<Vec<TickerSymbol>, ScreenError> {
    let text = text.trim_start_matches('\u{feff}');
    let leading = text.trim_start();
    if leading.is_empty() {
        return Err(ScreenError::source_unavailable(
            "constituent list is empty",
        ));
    }
    if leading.starts_with('<') {
        return Err(ScreenError::source_unavailable(
            "constituent list is markup, not tabular text",
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(leading.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ScreenError::source_unavailable(format!("invalid constituent header: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(ScreenError::source_unavailable(
            "constituent list has no header row",
        ));
    }

    let column = symbol_column(headers.iter());
    debug!(
        column,
        header = headers.get(column).unwrap_or_default(),
        "resolved constituent symbol column"
    );

    let mut seen = HashSet::new();
    let mut symbols = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                warn!(row, %error, "skipping unreadable constituent row");
                continue;
            }
        };

        let Some(raw) = record.get(column) else {
            continue;
        };
        let value = raw.trim().to_ascii_uppercase();
        if value.is_empty() || value == "NAN" {
            continue;
        }

        match TickerSymbol::with_suffix(&value, suffixes) {
            Ok(symbol) => {
                if seen.insert(symbol.clone()) {
                    symbols.push(symbol);
                }
            }
            Err(error) => warn!(row, value = %value, %error, "skipping invalid constituent symbol"),
        }
    }

    Ok(symbols)
}

fn symbol_column<'a>(headers: impl Iterator<Item = &'a str>) -> usize {
    headers
        .enumerate()
        .find(|(_, header)| {
            let header = header.trim().to_ascii_lowercase();
            SYMBOL_HEADERS.iter().any(|needle| header.contains(needle))
        })
        .map_or(0, |(index, _)| index)
}

/// Remote constituent list.
#[derive(Clone)]
pub struct UniverseSource {
    http_client: Arc<dyn HttpClient>,
    url: String,
    timeout_ms: u64,
    suffixes: ExchangeSuffixes,
}

impl Default for UniverseSource {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::default()))
    }
}

impl UniverseSource {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            url: String::from(NIFTY500_CSV_URL),
            timeout_ms: 30_000,
            suffixes: ExchangeSuffixes::default(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_suffixes(mut self, suffixes: ExchangeSuffixes) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the raw constituent text.
    pub async fn fetch_text(&self) -> Result<String, ScreenError> {
        let request = HttpRequest::get(self.url.as_str())
            .with_user_agent(BROWSER_USER_AGENT)
            .with_header("accept", "text/csv,text/plain,*/*")
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            ScreenError::source_unavailable(format!(
                "failed to download {}: {}",
                self.url,
                error.message()
            ))
        })?;

        if !response.is_success() {
            return Err(ScreenError::source_unavailable(format!(
                "{} returned status {}",
                self.url, response.status
            )));
        }

        Ok(response.body)
    }

    /// Download and resolve the universe.
    pub async fn resolve(&self) -> Result<Vec<TickerSymbol>, ScreenError> {
        let text = self.fetch_text().await?;
        let symbols = resolve_symbols(&text, &self.suffixes)?;
        info!(url = %self.url, count = symbols.len(), "resolved ticker universe");
        Ok(symbols)
    }
}
