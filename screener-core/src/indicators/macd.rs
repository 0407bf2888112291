//! MACD family: DIF, DEA and the histogram.
//!
//! DIF = EMA(price, fast) - EMA(price, slow)
//! DEA = EMA(DIF, signal)
//! MACD = factor * (DIF - DEA)
//!
//! All EMAs are non-adjusted and seeded with the first value.

use serde::{Deserialize, Serialize};

use super::ema::ema_of_series;
use crate::domain::Bar;

/// Price column feeding the MACD computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl PriceSource {
    pub fn extract(self, bars: &[Bar]) -> Vec<f64> {
        bars.iter()
            .map(|b| match self {
                PriceSource::Open => b.open,
                PriceSource::High => b.high,
                PriceSource::Low => b.low,
                PriceSource::Close => b.close,
            })
            .collect()
    }
}

/// Fast EMA span of the standard DIF.
pub const DIF_FAST: usize = 12;
/// Slow EMA span of the standard DIF.
pub const DIF_SLOW: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    /// Histogram multiplier; 2.0 is the common brokerage convention.
    pub factor: f64,
    pub source: PriceSource,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: DIF_FAST,
            slow: DIF_SLOW,
            signal: 9,
            factor: 2.0,
            source: PriceSource::Close,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub macd: Vec<f64>,
}

/// DIF over close.
pub fn compute_dif(bars: &[Bar], fast: usize, slow: usize) -> Vec<f64> {
    dif_of_series(&PriceSource::Close.extract(bars), fast, slow)
}

fn dif_of_series(prices: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let ema_fast = ema_of_series(prices, fast);
    let ema_slow = ema_of_series(prices, slow);
    ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect()
}

pub fn compute_macd(bars: &[Bar], params: &MacdParams) -> MacdSeries {
    let prices = params.source.extract(bars);
    let dif = dif_of_series(&prices, params.fast, params.slow);
    let dea = ema_of_series(&dif, params.signal);
    let macd = dif
        .iter()
        .zip(&dea)
        .map(|(d, e)| params.factor * (d - e))
        .collect();
    MacdSeries { dif, dea, macd }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn dif_starts_at_zero() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let dif = compute_dif(&bars, 12, 26);
        assert_approx(dif[0], 0.0, DEFAULT_EPSILON);
        assert!(dif[1] > 0.0 && dif[2] > dif[1]);
    }

    #[test]
    fn dif_known_value() {
        // fast=1 -> EMA = close; slow=3 -> alpha 0.5: 10, 10.5
        let bars = make_bars(&[10.0, 11.0]);
        let dif = compute_dif(&bars, 1, 3);
        assert_approx(dif[1], 11.0 - 10.5, DEFAULT_EPSILON);
    }

    #[test]
    fn macd_histogram_uses_factor() {
        let bars = make_bars(&[10.0, 11.0, 12.5, 12.0, 13.0, 15.0]);
        let params = MacdParams::default();
        let s = compute_macd(&bars, &params);
        for t in 0..bars.len() {
            assert_approx(s.macd[t], 2.0 * (s.dif[t] - s.dea[t]), DEFAULT_EPSILON);
        }
        assert_eq!(s.dif, compute_dif(&bars, 12, 26));
    }

    #[test]
    fn macd_source_selects_column() {
        let bars = make_bars(&[10.0, 11.0, 12.5, 12.0]);
        let params = MacdParams {
            source: PriceSource::High,
            ..MacdParams::default()
        };
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let s = compute_macd(&bars, &params);
        assert_eq!(s.dif, dif_of_series(&highs, 12, 26));
    }
}
