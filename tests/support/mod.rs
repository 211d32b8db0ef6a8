//! Test doubles shared by the behaviour suites.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use camscan_core::{
    Bar, CancellationFlag, HttpClient, HttpError, HttpRequest, HttpResponse, MonthlyBarSource,
    MonthlyBarsRequest, MonthlySeries, SourceError, TickerSymbol, UtcDateTime,
};

pub fn ticker(symbol: &str) -> TickerSymbol {
    TickerSymbol::parse(symbol).expect("valid symbol")
}

pub fn reference_time() -> UtcDateTime {
    UtcDateTime::parse("2024-06-15T09:15:00Z").expect("valid timestamp")
}

/// Monthly bar stamped at midnight UTC on the first of `month` (`YYYY-MM`).
pub fn bar(month: &str, high: f64, low: f64, close: f64) -> Bar {
    let ts = UtcDateTime::parse(&format!("{month}-01")).expect("valid month");
    Bar::new(ts, ts.year_month(), close, high, low, close, Some(1_000)).expect("valid bar")
}

/// Yahoo chart body for `(unix_seconds, open, high, low, close)` rows.
pub fn chart_body(gmt_offset: i32, rows: &[(i64, f64, f64, f64, f64)]) -> String {
    let column = |pick: fn(&(i64, f64, f64, f64, f64)) -> String| {
        rows.iter().map(pick).collect::<Vec<_>>().join(",")
    };
    format!(
        r#"{{"chart":{{"result":[{{"meta":{{"currency":"INR","gmtoffset":{gmt_offset}}},"timestamp":[{}],"indicators":{{"quote":[{{"open":[{}],"high":[{}],"low":[{}],"close":[{}],"volume":[{}]}}]}}}}],"error":null}}}}"#,
        column(|row| row.0.to_string()),
        column(|row| row.1.to_string()),
        column(|row| row.2.to_string()),
        column(|row| row.3.to_string()),
        column(|row| row.4.to_string()),
        column(|_| String::from("1000")),
    )
}

/// HTTP client that replays scripted responses in order; the last one repeats.
#[derive(Debug)]
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new(script: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: Result<HttpResponse, HttpError>) -> Self {
        Self::new(vec![response])
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push(request);
        let mut script = self.script.lock().expect("script should not be poisoned");
        let response = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
        .unwrap_or_else(|| Err(HttpError::new("no scripted response")));
        Box::pin(async move { response })
    }
}

/// In-memory history source keyed by ticker, with optional random latency.
#[derive(Default)]
pub struct FixtureSource {
    histories: HashMap<TickerSymbol, Result<Vec<Bar>, SourceError>>,
    max_latency_ms: u64,
    seed: u64,
    cancel_on: Option<(TickerSymbol, CancellationFlag)>,
    calls: Mutex<Vec<TickerSymbol>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.histories.insert(ticker(symbol), Ok(bars));
        self
    }

    pub fn with_error(mut self, symbol: &str, error: SourceError) -> Self {
        self.histories.insert(ticker(symbol), Err(error));
        self
    }

    /// Sleep a seeded random 0..=max_ms before answering.
    pub fn with_random_latency(mut self, max_ms: u64, seed: u64) -> Self {
        self.max_latency_ms = max_ms;
        self.seed = seed;
        self
    }

    /// Raise `flag` when `symbol` is requested.
    pub fn cancelling_on(mut self, symbol: &str, flag: CancellationFlag) -> Self {
        self.cancel_on = Some((ticker(symbol), flag));
        self
    }

    pub fn calls(&self) -> Vec<TickerSymbol> {
        self.calls.lock().expect("call log should not be poisoned").clone()
    }

    fn latency_for(&self, symbol: &TickerSymbol) -> Duration {
        if self.max_latency_ms == 0 {
            return Duration::ZERO;
        }
        let salt = symbol
            .as_str()
            .bytes()
            .fold(self.seed, |acc, byte| acc.wrapping_mul(31).wrapping_add(u64::from(byte)));
        let mut rng = fastrand::Rng::with_seed(salt);
        Duration::from_millis(rng.u64(0..=self.max_latency_ms))
    }
}

impl MonthlyBarSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn monthly_bars<'a>(
        &'a self,
        req: MonthlyBarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MonthlySeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .expect("call log should not be poisoned")
                .push(req.symbol.clone());
            if let Some((symbol, flag)) = &self.cancel_on {
                if *symbol == req.symbol {
                    flag.cancel();
                }
            }

            let latency = self.latency_for(&req.symbol);
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            match self.histories.get(&req.symbol) {
                Some(Ok(bars)) => Ok(MonthlySeries::new(req.symbol, bars.clone())),
                Some(Err(error)) => Err(error.clone()),
                None => Err(SourceError::not_found(format!("no fixture for {}", req.symbol))),
            }
        })
    }
}
