//! Adaptive-window uptrend detection on a BBI series.
//!
//! The series is normalised by the first value of each candidate window and
//! differenced; the window is an uptrend when the `q` quantile of those
//! differences is non-negative. That tolerates a share of down days up to `q`.
//! Windows are tried longest first and the first acceptance wins.

use crate::error::ConfigError;
use crate::stats::quantile;

/// Reject a quantile level outside [0, 1].
pub fn check_quantile(field: &'static str, q: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&q) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: q,
            expected: "0 <= q <= 1",
        })
    }
}

/// True when some trailing window of `bbi` between `min_window` and
/// `max_window` (default: the whole series) is a tolerated uptrend.
///
/// NaNs are dropped first; fewer than `min_window` remaining values is false.
pub fn bbi_deriv_uptrend(
    bbi: &[f64],
    min_window: usize,
    max_window: Option<usize>,
    q_threshold: f64,
) -> Result<bool, ConfigError> {
    Ok(longest_uptrend_window(bbi, min_window, max_window, q_threshold)?.is_some())
}

/// Length of the longest accepted window, if any.
pub fn longest_uptrend_window(
    bbi: &[f64],
    min_window: usize,
    max_window: Option<usize>,
    q_threshold: f64,
) -> Result<Option<usize>, ConfigError> {
    check_quantile("q_threshold", q_threshold)?;
    Ok(search_windows(bbi, min_window, max_window, q_threshold))
}

/// Window search without the quantile check; callers validated `q` already.
pub(crate) fn search_windows(
    bbi: &[f64],
    min_window: usize,
    max_window: Option<usize>,
    q: f64,
) -> Option<usize> {
    let values: Vec<f64> = bbi.iter().copied().filter(|v| !v.is_nan()).collect();
    if values.len() < min_window {
        return None;
    }

    let longest = max_window.map_or(values.len(), |m| m.min(values.len()));
    let shortest = min_window.max(2);
    (shortest..=longest)
        .rev()
        .find(|&w| window_is_uptrend(&values[values.len() - w..], q))
}

fn window_is_uptrend(window: &[f64], q: f64) -> bool {
    let base = window[0];
    if !(base.is_finite() && base > 0.0) {
        return false;
    }
    let diffs: Vec<f64> = window
        .windows(2)
        .map(|pair| pair[1] / base - pair[0] / base)
        .collect();
    quantile(&diffs, q).is_some_and(|v| v >= 0.0)
}
