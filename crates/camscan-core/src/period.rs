use thiserror::Error;

use crate::{Bar, UtcDateTime, YearMonth};

/// No bar in the history belongs to a finished month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoCompletedPeriod {
    #[error("history contains no bars")]
    EmptyHistory,
    #[error("only bar is the in-progress month {month}")]
    OnlyCurrentMonth { month: YearMonth },
}

/// Pick the most recent bar of a fully completed calendar month.
///
/// Scans `bars` (ascending) from the end and returns the first bar whose
/// month differs from `now`'s. When every bar is stamped with the current
/// month (a provider that labels the last completed bar with the run month)
/// the second-to-last bar is used instead.
pub fn select_last_completed(bars: &[Bar], now: UtcDateTime) -> Result<&Bar, NoCompletedPeriod> {
    let current = now.year_month();

    if let Some(bar) = bars.iter().rev().find(|bar| bar.month != current) {
        return Ok(bar);
    }

    match bars {
        [] => Err(NoCompletedPeriod::EmptyHistory),
        [_] => Err(NoCompletedPeriod::OnlyCurrentMonth { month: current }),
        [.., previous, _] => Ok(previous),
    }
}
