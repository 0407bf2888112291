//! Percentage change of close over one bar.
//!
//! PCT[t] = (close[t] - close[t-1]) / close[t-1] * 100
//! Lookback: 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct PctChange;

impl Indicator for PctChange {
    fn name(&self) -> &str {
        "pct_chg"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        pct_change(&closes)
    }
}

/// One-step percentage change. NaN at index 0 and wherever the previous value
/// is zero or NaN.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        let prev = values[i - 1];
        let curr = values[i];
        if !(prev.is_nan() || curr.is_nan() || prev == 0.0) {
            result[i] = (curr - prev) / prev * 100.0;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn pct_change_basic() {
        let bars = make_bars(&[100.0, 110.0, 99.0]);
        let result = PctChange.compute(&bars);
        assert!(result[0].is_nan());
        assert_approx(result[1], 10.0, DEFAULT_EPSILON);
        assert_approx(result[2], -10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn pct_change_zero_previous_is_nan() {
        let result = pct_change(&[0.0, 5.0]);
        assert!(result[1].is_nan());
    }
}
