//! Raw stochastic value against the highest close.
//!
//! RSV[t] = 100 * (close[t] - LLV(low, n)) / (HHV(close, n) - LLV(low, n) + 1e-9).
//! The high reference is the rolling max of close, not of high. Partial windows
//! at the start count.

use super::kdj::RANGE_EPSILON;
use super::Indicator;
use crate::domain::Bar;
use crate::stats::{rolling_max, rolling_min};

#[derive(Debug, Clone)]
pub struct Rsv {
    period: usize,
    name: String,
}

impl Rsv {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSV period must be >= 1");
        Self {
            period,
            name: format!("RSV_{period}"),
        }
    }
}

impl Indicator for Rsv {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        compute_rsv(bars, self.period)
    }
}

pub fn compute_rsv(bars: &[Bar], period: usize) -> Vec<f64> {
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let low_n = rolling_min(&lows, period);
    let high_close_n = rolling_max(&closes, period);

    closes
        .iter()
        .zip(low_n.iter().zip(&high_close_n))
        .map(|(&c, (&lo, &hi))| (c - lo) / (hi - lo + RANGE_EPSILON) * 100.0)
        .collect()
}
