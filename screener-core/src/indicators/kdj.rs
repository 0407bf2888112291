//! KDJ stochastic oscillator.
//!
//! RSV[t] = 100 * (close[t] - LLV(low, n)) / (HHV(high, n) - LLV(low, n) + 1e-9),
//! rolling over partial windows at the start.
//! K[0] = D[0] = 50; K[t] = 2/3 K[t-1] + 1/3 RSV[t]; D[t] = 2/3 D[t-1] + 1/3 K[t];
//! J = 3K - 2D.
//!
//! Produces three series (exposed as separate Indicator instances per line).

use super::Indicator;
use crate::domain::Bar;
use crate::stats::{rolling_max, rolling_min};

/// Denominator guard shared by the stochastic-style oscillators.
pub(crate) const RANGE_EPSILON: f64 = 1e-9;

/// Which line of the KDJ oscillator to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdjLine {
    K,
    D,
    J,
}

/// The three KDJ lines, each the same length as the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KdjSeries {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
    pub j: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Kdj {
    period: usize,
    line: KdjLine,
    name: String,
}

impl Kdj {
    pub fn new(period: usize, line: KdjLine) -> Self {
        assert!(period >= 1, "KDJ period must be >= 1");
        let name = match line {
            KdjLine::K => "K",
            KdjLine::D => "D",
            KdjLine::J => "J",
        };
        Self {
            period,
            line,
            name: name.to_string(),
        }
    }
}

impl Indicator for Kdj {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let series = compute_kdj(bars, self.period);
        match self.line {
            KdjLine::K => series.k,
            KdjLine::D => series.d,
            KdjLine::J => series.j,
        }
    }
}

/// Compute all three KDJ lines in one pass. Empty input gives empty lines.
pub fn compute_kdj(bars: &[Bar], period: usize) -> KdjSeries {
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low_n = rolling_min(&lows, period);
    let high_n = rolling_max(&highs, period);

    let mut series = KdjSeries {
        k: Vec::with_capacity(bars.len()),
        d: Vec::with_capacity(bars.len()),
        j: Vec::with_capacity(bars.len()),
    };

    let mut state: Option<(f64, f64)> = None;
    for (i, bar) in bars.iter().enumerate() {
        let (k, d) = match state {
            None => (50.0, 50.0),
            Some((k_prev, d_prev)) => {
                let rsv =
                    (bar.close - low_n[i]) / (high_n[i] - low_n[i] + RANGE_EPSILON) * 100.0;
                let k = 2.0 / 3.0 * k_prev + 1.0 / 3.0 * rsv;
                let d = 2.0 / 3.0 * d_prev + 1.0 / 3.0 * k;
                (k, d)
            }
        };
        series.k.push(k);
        series.d.push(d);
        series.j.push(3.0 * k - 2.0 * d);
        state = Some((k, d));
    }
    series
}
