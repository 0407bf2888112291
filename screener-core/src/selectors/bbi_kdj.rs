//! BBI uptrend + KDJ low + DIF positive.
//!
//! Gates, in order:
//! 1. close range over the trailing `max_window` bars within `price_range_pct`;
//! 2. BBI uptrend over an adaptive window (`bbi_min_window..=max_window`);
//! 3. J below `j_threshold`, or at/below its `j_q_threshold` quantile over the
//!    trailing `max_window` bars;
//! 4. DIF above zero.

use serde::{Deserialize, Serialize};

use super::{
    bbi_gate, check_finite, check_non_negative, check_unit, check_window, dif_gate, j_gate,
    price_range_gate, Selector,
};
use crate::domain::Bar;
use crate::error::{ConfigError, FrameError};
use crate::explain::{Evaluation, Gate};
use crate::frame::{IndicatorFrame, KDJ_PERIOD};
use crate::indicators::{DIF_FAST, DIF_SLOW};

/// Extra bars kept beyond `max_window` so the recursive indicators settle.
pub const HISTORY_BUFFER: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BbiKdjConfig {
    pub j_threshold: f64,
    pub bbi_min_window: usize,
    pub max_window: usize,
    /// Allowed `max/min - 1` of closes, as a ratio.
    pub price_range_pct: f64,
    pub bbi_q_threshold: f64,
    pub j_q_threshold: f64,
}

impl Default for BbiKdjConfig {
    fn default() -> Self {
        Self {
            j_threshold: -5.0,
            bbi_min_window: 90,
            max_window: 90,
            price_range_pct: 100.0,
            bbi_q_threshold: 0.05,
            j_q_threshold: 0.10,
        }
    }
}

impl BbiKdjConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("j_threshold", self.j_threshold)?;
        check_window("bbi_min_window", self.bbi_min_window, 2)?;
        check_window("max_window", self.max_window, 1)?;
        check_non_negative("price_range_pct", self.price_range_pct)?;
        check_unit("bbi_q_threshold", self.bbi_q_threshold)?;
        check_unit("j_q_threshold", self.j_q_threshold)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BbiKdjSelector {
    config: BbiKdjConfig,
}

impl BbiKdjSelector {
    pub fn new(config: BbiKdjConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BbiKdjConfig {
        &self.config
    }
}

impl Selector for BbiKdjSelector {
    fn name(&self) -> &str {
        "BBIKDJSelector"
    }

    fn history_len(&self) -> Option<usize> {
        Some(self.config.max_window + HISTORY_BUFFER)
    }

    fn evaluate(&self, hist: &[Bar]) -> Result<Evaluation, FrameError> {
        let cfg = &self.config;
        let frame = IndicatorFrame::new(hist)
            .with_bbi()
            .with_kdj(KDJ_PERIOD)
            .with_dif(DIF_FAST, DIF_SLOW);
        let mut eval = Evaluation::default();

        let closes = frame.tail("close", cfg.max_window)?;
        if !eval.record(price_range_gate(Gate::PriceRange, closes, cfg.price_range_pct)) {
            return Ok(eval);
        }

        let bbi = frame.column("BBI")?;
        if !eval.record(bbi_gate(
            bbi,
            cfg.bbi_min_window,
            Some(cfg.max_window),
            cfg.bbi_q_threshold,
        )) {
            return Ok(eval);
        }

        let j_window = frame.tail("J", cfg.max_window)?;
        if !eval.record(j_gate(
            frame.last("J")?,
            j_window,
            cfg.j_threshold,
            cfg.j_q_threshold,
        )) {
            return Ok(eval);
        }

        if !eval.record(dif_gate(frame.last("DIF")?)) {
            return Ok(eval);
        }

        Ok(eval.accept())
    }
}
