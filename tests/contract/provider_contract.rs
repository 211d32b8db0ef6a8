use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use camscan_core::{
    Bar, HistoryWindow, HttpClient, HttpError, HttpRequest, HttpResponse, MonthlyBarSource,
    MonthlyBarsRequest, MonthlyPayload, PayloadShape, TickerSymbol, YahooChartSource,
};

// 2024-03-01, 2024-04-01 and 2024-05-01 at 00:00 UTC.
const MAR: i64 = 1_709_251_200;
const APR: i64 = 1_711_929_600;
const MAY: i64 = 1_714_521_600;

const CHART: &str = r#"{"chart":{"result":[{"meta":{"symbol":"ACME.NS","gmtoffset":0},
"timestamp":[1709251200,1711929600,1714521600],
"indicators":{"quote":[{"open":[100.0,104.0,null],"high":[110.0,112.0,109.0],
"low":[95.0,101.0,99.5],"close":[104.0,108.0,101.0],"volume":[5000,6000,7000]}]}}],"error":null}}"#;

const COLUMNAR_JSON: &str = r#"{"columns":["Open","High","Low","Close","Volume"],
"index":[1709251200000,1711929600000,1714521600000],
"data":[[100.0,110.0,95.0,104.0,5000],[104.0,112.0,101.0,108.0,6000],[null,109.0,99.5,101.0,7000]]}"#;

const COLUMNAR_CSV: &str = "Date,Open,High,Low,Close,Volume
2024-03-01,100.0,110.0,95.0,104.0,5000
2024-04-01,104.0,112.0,101.0,108.0,6000
2024-05-01,,109.0,99.5,101.0,7000
";

// The same three months as NSE stamps them: 00:00 IST, i.e. 18:30Z the day before.
const IST_CHART: &str = r#"{"chart":{"result":[{"meta":{"symbol":"ACME.NS","gmtoffset":19800},
"timestamp":[1709231400,1711909800,1714501800],
"indicators":{"quote":[{"open":[100.0,104.0,null],"high":[110.0,112.0,109.0],
"low":[95.0,101.0,99.5],"close":[104.0,108.0,101.0],"volume":[5000,6000,7000]}]}}],"error":null}}"#;

const IST_COLUMNAR_JSON: &str = r#"{"columns":["Open","High","Low","Close","Volume"],
"index":[1709231400000,1711909800000,1714501800000],
"data":[[100.0,110.0,95.0,104.0,5000],[104.0,112.0,101.0,108.0,6000],[null,109.0,99.5,101.0,7000]]}"#;

const IST_COLUMNAR_CSV: &str = "Date,Open,High,Low,Close,Volume
1709231400,100.0,110.0,95.0,104.0,5000
1711909800,104.0,112.0,101.0,108.0,6000
1714501800,,109.0,99.5,101.0,7000
";

#[derive(Debug)]
struct FixedBodyClient {
    body: String,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FixedBodyClient {
    fn new(body: &str) -> Self {
        Self {
            body: body.to_owned(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl HttpClient for FixedBodyClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push(request);
        let response = HttpResponse::ok(self.body.clone());
        Box::pin(async move { Ok(response) })
    }
}

struct ShapeCase {
    shape: PayloadShape,
    body: &'static str,
}

fn shape_cases() -> Vec<ShapeCase> {
    vec![
        ShapeCase {
            shape: PayloadShape::ChartArrays,
            body: CHART,
        },
        ShapeCase {
            shape: PayloadShape::ColumnarJson,
            body: COLUMNAR_JSON,
        },
        ShapeCase {
            shape: PayloadShape::ColumnarCsv,
            body: COLUMNAR_CSV,
        },
    ]
}

fn request() -> MonthlyBarsRequest {
    MonthlyBarsRequest::new(
        TickerSymbol::parse("ACME.NS").expect("valid symbol"),
        HistoryWindow::default(),
    )
}

fn fetch(body: &str) -> Vec<Bar> {
    let source = YahooChartSource::with_http_client(Arc::new(FixedBodyClient::new(body)));
    block_on(source.monthly_bars(request()))
        .unwrap_or_else(|error| panic!("payload should parse: {error}"))
        .bars
}

#[test]
fn every_shape_is_detected_as_itself() {
    for case in shape_cases() {
        let payload = MonthlyPayload::detect(case.body).expect("shape detected");
        assert_eq!(payload.shape(), case.shape, "shape {}", case.shape.as_str());
    }
}

#[test]
fn every_shape_yields_the_same_ascending_bars() {
    let reference = fetch(CHART);
    assert_eq!(reference.len(), 3);

    for case in shape_cases() {
        let bars = fetch(case.body);
        assert_eq!(bars, reference, "shape {}", case.shape.as_str());
    }
}

#[test]
fn bars_keep_calendar_months_and_zero_missing_open() {
    let bars = fetch(CHART);

    let timestamps: Vec<_> = bars.iter().map(|bar| bar.ts.into_inner().unix_timestamp()).collect();
    assert_eq!(timestamps, vec![MAR, APR, MAY]);

    let months: Vec<_> = bars.iter().map(|bar| bar.month.to_string()).collect();
    assert_eq!(months, vec!["2024-03", "2024-04", "2024-05"]);

    assert_eq!(bars[2].open, 0.0);
    assert_eq!(bars[2].close, 101.0);
    assert_eq!(bars[0].volume, Some(5_000));
}

#[test]
fn exchange_stamped_epochs_yield_the_same_months_in_every_shape() {
    let reference = fetch(IST_CHART);
    let months: Vec<_> = reference.iter().map(|bar| bar.month.to_string()).collect();
    assert_eq!(months, vec!["2024-03", "2024-04", "2024-05"]);

    for body in [IST_COLUMNAR_JSON, IST_COLUMNAR_CSV] {
        let shape = MonthlyPayload::detect(body).expect("shape detected").shape();
        assert_eq!(fetch(body), reference, "shape {}", shape.as_str());
    }
}

#[test]
fn source_requests_monthly_interval_for_window() {
    let client = Arc::new(FixedBodyClient::new(CHART));
    let source = YahooChartSource::with_http_client(client.clone())
        .with_base_url("https://chart.test/v8/finance/chart/");
    let req = MonthlyBarsRequest::new(
        TickerSymbol::parse("TCS.BO").expect("valid symbol"),
        HistoryWindow::days(400).expect("valid window"),
    );

    block_on(source.monthly_bars(req)).expect("chart parses");

    let requests = client
        .requests
        .lock()
        .expect("request store should not be poisoned")
        .clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url,
        "https://chart.test/v8/finance/chart/TCS.BO?range=400d&interval=1mo"
    );
    assert_eq!(source.name(), "yahoo");
}

fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    let waker = noop_waker();
    let mut context = Context::from_waker(&waker);
    let mut future = std::pin::pin!(future);

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(output) => return output,
            Poll::Pending => std::thread::yield_now(),
        }
    }
}

fn noop_waker() -> Waker {
    // SAFETY: The vtable functions never dereference the data pointer and are no-op operations.
    unsafe { Waker::from_raw(noop_raw_waker()) }
}

fn noop_raw_waker() -> RawWaker {
    RawWaker::new(std::ptr::null(), &NOOP_RAW_WAKER_VTABLE)
}

unsafe fn noop_raw_waker_clone(_: *const ()) -> RawWaker {
    noop_raw_waker()
}

unsafe fn noop_raw_waker_wake(_: *const ()) {}

unsafe fn noop_raw_waker_wake_by_ref(_: *const ()) {}

unsafe fn noop_raw_waker_drop(_: *const ()) {}

static NOOP_RAW_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
    noop_raw_waker_clone,
    noop_raw_waker_wake,
    noop_raw_waker_wake_by_ref,
    noop_raw_waker_drop,
);
