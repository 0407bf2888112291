//! Exponential Moving Average (EMA), non-adjusted.
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (span + 1).
//! Seed: EMA[first] = x[first], so there is no warmup gap.
//! Lookback: 0.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("EMA{span}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.span)
    }
}

/// Compute a non-adjusted EMA over an arbitrary series.
///
/// The first finite value seeds the recursion. A NaN input leaves the state
/// untouched and repeats the last output (NaN before the seed).
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    if span == 0 {
        result.resize(values.len(), f64::NAN);
        return result;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev: Option<f64> = None;
    for &v in values {
        if v.is_nan() {
            result.push(prev.unwrap_or(f64::NAN));
            continue;
        }
        let ema = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        result.push(ema);
        prev = Some(ema);
    }
    result
}
