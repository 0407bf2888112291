//! BBI uptrend with a short-term shakeout inside a long-term high.
//!
//! Over the trailing `m` bars the long RSV stays at or above 80 while the
//! short RSV starts and ends at or above 80 and dips below 20 in between.

use serde::{Deserialize, Serialize};

use super::{bbi_gate, check_unit, check_window, dif_gate, Selector};
use crate::domain::Bar;
use crate::error::{ConfigError, FrameError};
use crate::explain::{Evaluation, Gate, GateDetail, GateRecord};
use crate::frame::IndicatorFrame;
use crate::indicators::{DIF_FAST, DIF_SLOW};
use crate::stats::min_max;

const RSV_HIGH: f64 = 80.0;
const RSV_LOW: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BbiShortLongConfig {
    pub n_short: usize,
    pub n_long: usize,
    /// Bars in the trailing RSV window.
    pub m: usize,
    pub bbi_min_window: usize,
    pub max_window: usize,
    pub bbi_q_threshold: f64,
}

impl Default for BbiShortLongConfig {
    fn default() -> Self {
        Self {
            n_short: 3,
            n_long: 21,
            m: 3,
            bbi_min_window: 90,
            max_window: 150,
            bbi_q_threshold: 0.05,
        }
    }
}

impl BbiShortLongConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_window("n_short", self.n_short, 1)?;
        check_window("n_long", self.n_long, 1)?;
        check_window("m", self.m, 2)?;
        check_window("bbi_min_window", self.bbi_min_window, 2)?;
        check_window("max_window", self.max_window, 1)?;
        check_unit("bbi_q_threshold", self.bbi_q_threshold)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BbiShortLongSelector {
    config: BbiShortLongConfig,
}

impl BbiShortLongSelector {
    pub fn new(config: BbiShortLongConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BbiShortLongConfig {
        &self.config
    }
}

fn rsv_detail(period: usize, window: &[f64]) -> Option<GateDetail> {
    let (min, max) = min_max(window)?;
    Some(GateDetail::Rsv {
        period,
        first: *window.first()?,
        last: *window.last()?,
        min,
        max,
    })
}

fn rsv_record(gate: Gate, period: usize, window: &[f64], passed: bool) -> GateRecord {
    let value = window.last().copied().unwrap_or(f64::NAN);
    let record = GateRecord::new(gate, value, RSV_HIGH, passed);
    match rsv_detail(period, window) {
        Some(detail) => record.with_detail(detail),
        None => record,
    }
}

impl Selector for BbiShortLongSelector {
    fn name(&self) -> &str {
        "BBIShortLongSelector"
    }

    fn history_len(&self) -> Option<usize> {
        let cfg = &self.config;
        let need = cfg.n_short.max(cfg.n_long) + cfg.bbi_min_window + cfg.m;
        Some(need.max(cfg.max_window))
    }

    fn evaluate(&self, hist: &[Bar]) -> Result<Evaluation, FrameError> {
        let cfg = &self.config;
        let short_col = format!("RSV_{}", cfg.n_short);
        let long_col = format!("RSV_{}", cfg.n_long);
        let frame = IndicatorFrame::new(hist)
            .with_bbi()
            .with_rsv(cfg.n_short)
            .with_rsv(cfg.n_long)
            .with_dif(DIF_FAST, DIF_SLOW);
        let mut eval = Evaluation::default();

        if !eval.record(bbi_gate(
            frame.column("BBI")?,
            cfg.bbi_min_window,
            Some(cfg.max_window),
            cfg.bbi_q_threshold,
        )) {
            return Ok(eval);
        }

        if frame.len() < cfg.m {
            eval.record(GateRecord::new(
                Gate::History,
                frame.len() as f64,
                cfg.m as f64,
                false,
            ));
            return Ok(eval);
        }

        let long = frame.tail(&long_col, cfg.m)?;
        let long_ok = long.iter().all(|&v| v >= RSV_HIGH);
        if !eval.record(rsv_record(Gate::RsvLong, cfg.n_long, long, long_ok)) {
            return Ok(eval);
        }

        let short = frame.tail(&short_col, cfg.m)?;
        let ends_high = short[0] >= RSV_HIGH && short[short.len() - 1] >= RSV_HIGH;
        let dipped = short.iter().any(|&v| v < RSV_LOW);
        if !eval.record(rsv_record(
            Gate::RsvShort,
            cfg.n_short,
            short,
            ends_high && dipped,
        )) {
            return Ok(eval);
        }

        if !eval.record(dif_gate(frame.last("DIF")?)) {
            return Ok(eval);
        }

        Ok(eval.accept())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::testing::tight_bars;

    /// 158-bar climb of 0.1 per day from 10, then three bars relative to
    /// the last climb close.
    fn bars_ending(tail: [f64; 3]) -> Vec<Bar> {
        let mut closes: Vec<f64> = (0..158).map(|i| 10.0 + 0.1 * i as f64).collect();
        let last = closes[157];
        closes.extend(tail.iter().map(|d| last + d));
        tight_bars(&closes)
    }

    fn history(bars: &[Bar], sel: &BbiShortLongSelector) -> Vec<Bar> {
        let keep = sel.history_len().unwrap();
        bars[bars.len().saturating_sub(keep)..].to_vec()
    }

    #[test]
    fn history_len_covers_rsv_and_bbi() {
        let sel = BbiShortLongSelector::new(BbiShortLongConfig::default()).unwrap();
        assert_eq!(sel.history_len(), Some(150));
        let wide = BbiShortLongSelector::new(BbiShortLongConfig {
            bbi_min_window: 140,
            ..BbiShortLongConfig::default()
        })
        .unwrap();
        assert_eq!(wide.history_len(), Some(21 + 140 + 3));
    }

    #[test]
    fn shakeout_and_recovery_passes() {
        let sel = BbiShortLongSelector::new(BbiShortLongConfig::default()).unwrap();
        let bars = bars_ending([0.1, -0.2, 0.2]);
        let eval = sel.evaluate(&history(&bars, &sel)).unwrap();
        assert!(eval.passed, "{:?}", eval.gates);
        let gates: Vec<Gate> = eval.gates.iter().map(|g| g.gate).collect();
        assert_eq!(
            gates,
            vec![Gate::BbiUptrend, Gate::RsvLong, Gate::RsvShort, Gate::Dif]
        );
        match &eval.gate(Gate::RsvShort).unwrap().detail {
            Some(GateDetail::Rsv { period, min, .. }) => {
                assert_eq!(*period, 3);
                assert!(*min < 20.0);
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn no_rebound_fails_short_rsv() {
        let sel = BbiShortLongSelector::new(BbiShortLongConfig::default()).unwrap();
        let bars = bars_ending([0.1, -0.2, -0.1]);
        let eval = sel.evaluate(&history(&bars, &sel)).unwrap();
        assert!(!eval.passed);
        assert_eq!(eval.gates.last().unwrap().gate, Gate::RsvShort);
    }

    #[test]
    fn deep_dip_breaks_long_rsv() {
        let sel = BbiShortLongSelector::new(BbiShortLongConfig::default()).unwrap();
        let bars = bars_ending([0.1, -3.0, 0.2]);
        let eval = sel.evaluate(&history(&bars, &sel)).unwrap();
        assert!(!eval.passed);
        assert_eq!(eval.gates.last().unwrap().gate, Gate::RsvLong);
    }

    #[test]
    fn short_history_fails_bbi() {
        let sel = BbiShortLongSelector::new(BbiShortLongConfig::default()).unwrap();
        let bars = bars_ending([0.1, -0.2, 0.2]);
        let eval = sel.evaluate(&bars[bars.len() - 100..]).unwrap();
        assert!(!eval.passed);
        assert_eq!(eval.gates[0].gate, Gate::BbiUptrend);
    }

    #[test]
    fn m_below_two_rejected() {
        let cfg = BbiShortLongConfig {
            m: 1,
            ..BbiShortLongConfig::default()
        };
        assert!(matches!(
            BbiShortLongSelector::new(cfg),
            Err(ConfigError::InvalidWindow { field: "m", .. })
        ));
    }
}
