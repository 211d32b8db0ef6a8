use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use time::UtcOffset;
use tracing::debug;

use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{MonthlyBarSource, MonthlyBarsRequest, MonthlySeries, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient, BROWSER_USER_AGENT};
use crate::payload::MonthlyPayload;

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// NSE and BSE trade at UTC+05:30.
pub const IST_OFFSET_SECONDS: i32 = 19_800;

/// Monthly history from the Yahoo v8 chart endpoint.
///
/// One `monthly_bars` call is one HTTP attempt. Status handling:
///
/// - `404` and other non-retryable `4xx`: the symbol has no data ([`SourceError::not_found`]).
/// - `429`: [`SourceError::rate_limited`].
/// - `408` and `5xx`: [`SourceError::transport`]; counts against the breaker.
#[derive(Clone)]
pub struct YahooChartSource {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
    circuit_breaker: Arc<CircuitBreaker>,
    exchange_offset: UtcOffset,
}

impl Default for YahooChartSource {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::default()))
    }
}

impl YahooChartSource {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(YAHOO_CHART_URL),
            timeout_ms: 10_000,
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            exchange_offset: UtcOffset::from_whole_seconds(IST_OFFSET_SECONDS)
                .unwrap_or(UtcOffset::UTC),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    /// Offset used to month epoch timestamps in payloads that carry none.
    pub fn with_exchange_offset(mut self, exchange_offset: UtcOffset) -> Self {
        self.exchange_offset = exchange_offset;
        self
    }

    pub fn exchange_offset(&self) -> UtcOffset {
        self.exchange_offset
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn chart_url(&self, req: &MonthlyBarsRequest) -> String {
        format!(
            "{}/{}?range={}&interval=1mo",
            self.base_url,
            urlencoding::encode(req.symbol.as_str()),
            req.window.range_param()
        )
    }

    async fn fetch_body(&self, req: &MonthlyBarsRequest) -> Result<String, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::circuit_open(
                "yahoo circuit breaker is open; skipping upstream call",
            ));
        }

        let url = self.chart_url(req);
        debug!(symbol = %req.symbol, %url, "requesting monthly chart");

        let request = HttpRequest::get(url)
            .with_user_agent(BROWSER_USER_AGENT)
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            SourceError::transport(format!("yahoo transport error: {}", error.message()))
        })?;

        match response.status {
            status if (200..300).contains(&status) => {
                self.circuit_breaker.record_success();
                Ok(response.body)
            }
            429 => {
                self.circuit_breaker.record_failure();
                Err(SourceError::rate_limited("yahoo returned status 429"))
            }
            status @ (408 | 500..=599) => {
                self.circuit_breaker.record_failure();
                Err(SourceError::transport(format!(
                    "yahoo returned status {status}"
                )))
            }
            status => {
                // The host answered; a missing symbol is not an outage.
                self.circuit_breaker.record_success();
                Err(SourceError::not_found(format!(
                    "yahoo returned status {status} for {}",
                    req.symbol
                )))
            }
        }
    }
}

impl MonthlyBarSource for YahooChartSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn monthly_bars<'a>(
        &'a self,
        req: MonthlyBarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MonthlySeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let body = self.fetch_body(&req).await?;
            let payload = MonthlyPayload::detect(&body)?;
            debug!(symbol = %req.symbol, shape = payload.shape().as_str(), "parsing history payload");
            let bars = payload.into_bars_at(self.exchange_offset)?;
            Ok(MonthlySeries::new(req.symbol, bars))
        })
    }
}
