//! Bull-Bear Index (BBI).
//!
//! BBI[t] = (SMA3 + SMA6 + SMA12 + SMA24) / 4 over close.
//! Lookback: 23 (NaN until the 24-bar SMA is defined).

use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Bar;

/// Component SMA windows, shortest first.
pub const BBI_WINDOWS: [usize; 4] = [3, 6, 12, 24];

#[derive(Debug, Clone, Default)]
pub struct Bbi;

impl Indicator for Bbi {
    fn name(&self) -> &str {
        "BBI"
    }

    fn lookback(&self) -> usize {
        BBI_WINDOWS[3] - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        compute_bbi(bars)
    }
}

pub fn compute_bbi(bars: &[Bar]) -> Vec<f64> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let mut acc = vec![0.0; closes.len()];
    for window in BBI_WINDOWS {
        for (a, v) in acc.iter_mut().zip(sma_of_series(&closes, window)) {
            *a += v;
        }
    }
    acc.into_iter().map(|s| s / BBI_WINDOWS.len() as f64).collect()
}
