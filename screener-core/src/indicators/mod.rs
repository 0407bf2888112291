//! Indicator library.
//!
//! Every indicator is a pure function of the bar slice it is given: the value
//! at bar t depends only on bars 0..=t. Nothing is cached between calls; the
//! selectors recompute from whatever history the driver hands them.
//!
//! Multi-series indicators (KDJ, MACD) are exposed both as one-pass functions
//! returning all lines and as per-line `Indicator` instances.

pub mod bbi;
pub mod change;
pub mod ema;
pub mod kdj;
pub mod macd;
pub mod rsv;
pub mod sma;

pub use bbi::{compute_bbi, Bbi};
pub use change::{pct_change, PctChange};
pub use ema::{ema_of_series, Ema};
pub use kdj::{compute_kdj, Kdj, KdjLine, KdjSeries};
pub use macd::{
    compute_dif, compute_macd, MacdParams, MacdSeries, PriceSource, DIF_FAST, DIF_SLOW,
};
pub use rsv::{compute_rsv, Rsv};
pub use sma::{sma_of_series, Sma};

use crate::domain::Bar;

/// Trait for single-series indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Column name in an indicator frame (e.g. "BBI", "RSV_21").
    fn name(&self) -> &str;

    /// Number of leading NaN values in the output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
