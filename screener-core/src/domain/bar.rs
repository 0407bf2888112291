//! Bar, the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// Daily OHLCV bar for a single symbol.
///
/// Produced by the data collaborator and never mutated by the screening core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLCV sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    /// Larger of open and close (the candle body top).
    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }
}

/// Check that a series is non-empty, strictly ascending by date and made of
/// complete, internally consistent bars.
pub fn validate_series(bars: &[Bar]) -> Result<(), SeriesError> {
    if bars.is_empty() {
        return Err(SeriesError::Empty);
    }
    for (index, bar) in bars.iter().enumerate() {
        if bar.is_void() {
            return Err(SeriesError::VoidBar {
                index,
                date: bar.date,
            });
        }
        if !bar.is_sane() {
            return Err(SeriesError::InconsistentBar {
                index,
                date: bar.date,
            });
        }
        if index > 0 && bar.date <= bars[index - 1].date {
            return Err(SeriesError::Unordered {
                index,
                previous: bars[index - 1].date,
                current: bar.date,
            });
        }
    }
    Ok(())
}

/// History up to and including `date`.
///
/// Assumes ascending dates; the slice is a prefix of `bars`.
pub fn history_until(bars: &[Bar], date: NaiveDate) -> &[Bar] {
    let end = bars.partition_point(|b| b.date <= date);
    &bars[..end]
}

/// The trailing `n` bars (all of them when fewer exist).
pub fn tail(bars: &[Bar], n: usize) -> &[Bar] {
    &bars[bars.len().saturating_sub(n)..]
}
