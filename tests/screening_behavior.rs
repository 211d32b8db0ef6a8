//! Behavior-driven tests for end-to-end screening runs.
//!
//! These tests drive the screener against in-memory histories and verify
//! the ranked output, the per-disposition summary, pacing, cancellation and
//! the CSV report.

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use camscan_core::{
    compute, passes_threshold, round_to, screen, write_report_file, Bar, CancellationFlag,
    FailureReason, RetryPolicy, ScreenConfig, ScreenReport, Screener, SimulatedSleeper,
    TickerSymbol, DEFAULT_MULTIPLIER,
};

use support::{bar, reference_time, ticker, FixtureSource};

/// April, May (last completed) and the in-progress June.
fn history(high: f64, low: f64, close: f64) -> Vec<Bar> {
    vec![
        bar("2024-04", 130.0, 70.0, 100.0),
        bar("2024-05", high, low, close),
        bar("2024-06", 125.0, 95.0, 121.0),
    ]
}

fn config() -> ScreenConfig {
    ScreenConfig::default()
        .with_pause(Duration::ZERO)
        .with_as_of(Some(reference_time()))
}

fn universe(symbols: &[&str]) -> Vec<TickerSymbol> {
    symbols.iter().map(|symbol| ticker(symbol)).collect()
}

fn tickers(results: &[camscan_core::PivotResult]) -> Vec<&str> {
    results.iter().map(|result| result.ticker.as_str()).collect()
}

async fn run(source: FixtureSource, config: ScreenConfig, symbols: &[&str]) -> ScreenReport {
    Screener::new(Arc::new(source), config)
        .with_sleeper(Arc::new(SimulatedSleeper::new()))
        .screen(&universe(symbols))
        .await
        .expect("screen completes")
}

fn mixed_source() -> FixtureSource {
    FixtureSource::new()
        // 11.64%: filtered at the default threshold
        .with_bars("WIDE.NS", history(110.0, 90.0, 100.0))
        // 4.50%
        .with_bars("MID.NS", history(104.0, 96.0, 100.0))
        // 2.22%
        .with_bars("TIGHT.NS", history(102.0, 98.0, 100.0))
}

// =============================================================================
// Ranking and Summary
// =============================================================================

#[tokio::test]
async fn when_universe_is_screened_tight_ranges_rank_first() {
    // Given: Three tickers with known ranges and one without history
    let source = mixed_source();

    // When: The universe is screened with the defaults
    let report = run(
        source,
        config(),
        &["WIDE.NS", "MID.NS", "GONE.NS", "TIGHT.NS"],
    )
    .await;

    // Then: Included results are ascending by percent range
    assert_eq!(tickers(&report.ranked), vec!["TIGHT.NS", "MID.NS"]);
    assert_eq!(tickers(&report.filtered), vec!["WIDE.NS"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].ticker.as_str(), "GONE.NS");
    assert_eq!(report.failures[0].reason, FailureReason::NoData);

    // And: Every ticker is counted exactly once
    let summary = report.summary;
    assert_eq!(summary.universe, 4);
    assert_eq!(summary.included, 2);
    assert_eq!(summary.filtered, 1);
    assert_eq!(summary.no_data, 1);
    assert_eq!(summary.skipped, 0);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn when_month_is_in_progress_levels_come_from_previous_month() {
    // Given: A history whose newest bar is the running month
    let source = FixtureSource::new().with_bars("MID.NS", history(104.0, 96.0, 100.0));

    // When: It is screened mid-June
    let report = run(source, config(), &["MID.NS"]).await;

    // Then: May is the basis and June only supplies the latest close
    let result = &report.ranked[0];
    assert_eq!(result.year_month.to_string(), "2024-05");
    assert_eq!(result.period_end.to_string(), "2024-05-31");
    assert_eq!(round_to(result.r3, 2), 102.2);
    assert_eq!(round_to(result.s3, 2), 97.8);
    assert_eq!(round_to(result.percent_range, 2), 4.5);
    assert_eq!(result.latest_close, 121.0);
}

#[tokio::test]
async fn when_ranges_tie_ticker_breaks_the_tie() {
    let source = FixtureSource::new()
        .with_bars("ZETA.NS", history(104.0, 96.0, 100.0))
        .with_bars("ALPHA.NS", history(104.0, 96.0, 100.0));

    let report = run(source, config(), &["ZETA.NS", "ALPHA.NS"]).await;

    assert_eq!(tickers(&report.ranked), vec!["ALPHA.NS", "ZETA.NS"]);
}

#[tokio::test]
async fn when_universe_repeats_tickers_each_is_screened_once() {
    let source = mixed_source();

    let report = run(source, config(), &["MID.NS", "MID.NS", "TIGHT.NS"]).await;

    assert_eq!(report.summary.universe, 2);
    assert_eq!(tickers(&report.ranked), vec!["TIGHT.NS", "MID.NS"]);
}

#[tokio::test]
async fn when_max_tickers_is_set_universe_is_truncated_in_order() {
    // Given: A limit of two tickers
    let source = Arc::new(mixed_source());
    let config = config().with_max_tickers(Some(2));

    // When: Four tickers are offered
    let report = Screener::new(source.clone(), config)
        .screen(&universe(&["WIDE.NS", "MID.NS", "TIGHT.NS", "GONE.NS"]))
        .await
        .expect("screen completes");

    // Then: Only the first two were fetched
    assert_eq!(report.summary.universe, 2);
    assert_eq!(
        source.calls(),
        universe(&["WIDE.NS", "MID.NS"])
    );
}

// =============================================================================
// Threshold
// =============================================================================

#[test]
fn threshold_is_a_strict_upper_bound() {
    assert!(!passes_threshold(6.5, 6.5));
    assert!(passes_threshold(6.4999, 6.5));
    assert!(!passes_threshold(6.5001, 6.5));
}

#[tokio::test]
async fn when_range_equals_threshold_ticker_is_filtered() {
    // Given: A threshold exactly equal to the computed range
    let exact = compute(104.0, 96.0, 100.0, DEFAULT_MULTIPLIER)
        .percent_range
        .expect("defined range");
    let source = FixtureSource::new().with_bars("MID.NS", history(104.0, 96.0, 100.0));

    // When: The ticker is screened at that threshold
    let report = run(source, config().with_threshold_pct(exact), &["MID.NS"]).await;

    // Then: It is computed but not included
    assert!(report.ranked.is_empty());
    assert_eq!(tickers(&report.filtered), vec!["MID.NS"]);
}

#[tokio::test]
async fn when_range_is_just_below_threshold_ticker_is_included() {
    let exact = compute(104.0, 96.0, 100.0, DEFAULT_MULTIPLIER)
        .percent_range
        .expect("defined range");
    let source = FixtureSource::new().with_bars("MID.NS", history(104.0, 96.0, 100.0));

    let report = run(
        source,
        config().with_threshold_pct(exact + 1e-9),
        &["MID.NS"],
    )
    .await;

    assert_eq!(tickers(&report.ranked), vec!["MID.NS"]);
}

#[tokio::test]
async fn when_multiplier_changes_ranges_scale_with_it() {
    let source = FixtureSource::new().with_bars("WIDE.NS", history(110.0, 90.0, 100.0));

    // R3 - S3 = 20 * 0.5 / 2 = 5, S3 = 97.5
    let report = run(source, config().with_multiplier(0.5), &["WIDE.NS"]).await;

    let result = &report.ranked[0];
    assert_eq!(result.r3, 102.5);
    assert_eq!(result.s3, 97.5);
    assert_eq!(round_to(result.percent_range, 2), 5.13);
}

// =============================================================================
// Undefined Ranges
// =============================================================================

#[tokio::test]
async fn when_s3_is_zero_ticker_is_reported_and_run_continues() {
    // Given: A bar whose S3 lands exactly on zero with M = 1
    let source = FixtureSource::new()
        .with_bars("ZERO.NS", history(40.0, 0.0, 10.0))
        .with_bars("MID.NS", history(104.0, 96.0, 100.0));

    // When: The universe is screened
    let report = run(
        source,
        config().with_multiplier(1.0),
        &["ZERO.NS", "MID.NS"],
    )
    .await;

    // Then: The zero-S3 ticker is a division_undefined failure
    assert_eq!(report.summary.division_undefined, 1);
    assert_eq!(report.failures[0].reason, FailureReason::DivisionUndefined);
    assert_eq!(tickers(&report.ranked), vec!["MID.NS"]);
}

// =============================================================================
// Concurrency and Pacing
// =============================================================================

#[tokio::test]
async fn when_run_concurrently_report_matches_sequential_run() {
    // Given: Histories answered with seeded random latency
    let symbols = [
        "AAA.NS", "BBB.NS", "CCC.NS", "DDD.NS", "EEE.NS", "FFF.NS", "GGG.NS", "HHH.NS",
    ];
    let mut rng = fastrand::Rng::with_seed(7);
    let mut fixtures = Vec::new();
    for symbol in symbols {
        let close = 100.0;
        let half = rng.f64() * 10.0 + 0.5;
        fixtures.push((symbol, history(close + half, close - half, close)));
    }
    let source = |latency: u64| {
        fixtures
            .iter()
            .fold(FixtureSource::new(), |source, (symbol, bars)| {
                source.with_bars(symbol, bars.clone())
            })
            .with_random_latency(latency, 42)
    };

    // When: The same universe is screened with one and with four streams
    let sequential = run(source(0), config(), &symbols).await;
    let concurrent = run(source(15), config().with_concurrency(4), &symbols).await;

    // Then: Ranked output, filtered output and summary are identical
    assert_eq!(concurrent.ranked, sequential.ranked);
    assert_eq!(concurrent.filtered, sequential.filtered);
    assert_eq!(concurrent.summary, sequential.summary);
    assert_eq!(
        concurrent.summary.included + concurrent.summary.filtered,
        symbols.len()
    );
}

#[tokio::test]
async fn when_pause_is_set_requests_are_spaced() {
    // Given: A 30ms pause and a single stream
    let source = mixed_source();
    let config = config().with_pause(Duration::from_millis(30));

    // When: Three tickers are screened
    let started = Instant::now();
    let report = run(source, config, &["WIDE.NS", "MID.NS", "TIGHT.NS"]).await;

    // Then: Two pauses separate the three requests
    assert_eq!(report.summary.universe, 3);
    assert!(
        started.elapsed() >= Duration::from_millis(55),
        "elapsed {:?}",
        started.elapsed()
    );
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn when_cancelled_before_start_every_ticker_is_skipped() {
    let cancel = CancellationFlag::new();
    cancel.cancel();
    let source = Arc::new(mixed_source());

    let report = Screener::new(source.clone(), config())
        .with_cancellation(cancel)
        .screen(&universe(&["WIDE.NS", "MID.NS"]))
        .await
        .expect("screen completes");

    assert!(report.cancelled);
    assert_eq!(report.summary.skipped, 2);
    assert!(report.ranked.is_empty());
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn when_cancelled_mid_run_started_tickers_finish_and_rest_are_skipped() {
    // Given: The source raises the stop flag while fetching the second ticker
    let cancel = CancellationFlag::new();
    let source = Arc::new(mixed_source().cancelling_on("MID.NS", cancel.clone()));

    // When: Four tickers are screened sequentially
    let report = Screener::new(source.clone(), config())
        .with_cancellation(cancel)
        .screen(&universe(&["WIDE.NS", "MID.NS", "TIGHT.NS", "GONE.NS"]))
        .await
        .expect("screen completes");

    // Then: The in-flight ticker completed and the remaining two were skipped
    assert!(report.cancelled);
    assert_eq!(report.summary.universe, 4);
    assert_eq!(report.summary.skipped, 2);
    assert_eq!(tickers(&report.ranked), vec!["MID.NS"]);
    assert_eq!(tickers(&report.filtered), vec!["WIDE.NS"]);
    assert_eq!(source.calls(), universe(&["WIDE.NS", "MID.NS"]));
}

// =============================================================================
// Retries
// =============================================================================

#[tokio::test]
async fn when_ticker_has_no_data_retries_use_simulated_clock() {
    // Given: An empty history and the default two linear retries
    let source = Arc::new(FixtureSource::new().with_bars("EMPTY.NS", Vec::new()));
    let sleeper = Arc::new(SimulatedSleeper::new());

    // When: It is screened
    let report = Screener::new(source.clone(), config().with_retry(RetryPolicy::default()))
        .with_sleeper(sleeper.clone())
        .screen(&universe(&["EMPTY.NS"]))
        .await
        .expect("screen completes");

    // Then: Three attempts, 3s of simulated backoff and a no_data outcome
    assert_eq!(report.summary.no_data, 1);
    assert_eq!(source.calls().len(), 3);
    assert_eq!(sleeper.elapsed(), Duration::from_secs(3));
}

// =============================================================================
// CSV Report
// =============================================================================

#[tokio::test]
async fn when_report_is_written_csv_lists_every_started_ticker() {
    // Given: A finished run with included, filtered and failed tickers
    let report = screen(
        &universe(&["WIDE.NS", "MID.NS", "GONE.NS", "TIGHT.NS"]),
        Arc::new(mixed_source()),
        config().with_retry(RetryPolicy::no_retry()),
    )
    .await
    .expect("screen completes");
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("report.csv");

    // When: The report is persisted
    let rows = write_report_file(&report, &path).expect("report written");

    // Then: Rows follow ranked, filtered, failed order with rounded values
    assert_eq!(rows, 4);
    let mut reader = csv::Reader::from_path(&path).expect("report readable");
    let headers = reader.headers().expect("header row").clone();
    assert_eq!(headers.get(0), Some("ticker"));
    assert!(headers.iter().any(|header| header == "percent_range"));

    let records: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .expect("records parse");
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .expect("column present")
    };
    let statuses: Vec<_> = records
        .iter()
        .map(|record| (record[0].to_owned(), record[column("status")].to_owned()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (String::from("TIGHT.NS"), String::from("included")),
            (String::from("MID.NS"), String::from("included")),
            (String::from("WIDE.NS"), String::from("filtered")),
            (String::from("GONE.NS"), String::from("no_data")),
        ]
    );
    assert_eq!(&records[1][column("percent_range")], "4.5");
    assert_eq!(&records[1][column("year_month")], "2024-05");
    assert_eq!(&records[3][column("r3")], "");
}
