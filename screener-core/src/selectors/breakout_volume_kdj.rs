//! Volume breakout in the last `offset` bars, then a KDJ pullback.
//!
//! Indicators are computed on the trailing `max_window` bars only, so the
//! KDJ and DIF seeds sit at the start of that window.

use serde::{Deserialize, Serialize};

use super::{
    check_finite, check_non_negative, check_unit, check_window, dif_gate, history_gate, j_gate,
    price_range_gate, Selector,
};
use crate::domain::{tail, Bar};
use crate::error::{ConfigError, FrameError};
use crate::explain::{BreakoutDay, Evaluation, Gate, GateDetail, GateRecord};
use crate::frame::{IndicatorFrame, KDJ_PERIOD};
use crate::indicators::{DIF_FAST, DIF_SLOW};

/// How far J may sit below today's J on any bar from the breakout to yesterday.
const J_HOLD_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakoutVolumeKdjConfig {
    pub j_threshold: f64,
    /// Minimum one-day close change of the breakout bar, in percent.
    pub up_threshold: f64,
    /// Every other volume in the window must be at most this multiple of the
    /// breakout bar's volume.
    pub volume_threshold: f64,
    pub offset: usize,
    pub max_window: usize,
    pub price_range_pct: f64,
    pub j_q_threshold: f64,
}

impl Default for BreakoutVolumeKdjConfig {
    fn default() -> Self {
        Self {
            j_threshold: 0.0,
            up_threshold: 3.0,
            volume_threshold: 2.0 / 3.0,
            offset: 15,
            max_window: 120,
            price_range_pct: 10.0,
            j_q_threshold: 0.10,
        }
    }
}

impl BreakoutVolumeKdjConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("j_threshold", self.j_threshold)?;
        check_finite("up_threshold", self.up_threshold)?;
        check_non_negative("volume_threshold", self.volume_threshold)?;
        check_window("offset", self.offset, 1)?;
        check_window("max_window", self.max_window, 2)?;
        check_non_negative("price_range_pct", self.price_range_pct)?;
        check_unit("j_q_threshold", self.j_q_threshold)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BreakoutVolumeKdjSelector {
    config: BreakoutVolumeKdjConfig,
}

impl BreakoutVolumeKdjSelector {
    pub fn new(config: BreakoutVolumeKdjConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BreakoutVolumeKdjConfig {
        &self.config
    }

    /// Every bar among the `offset` bars before today that qualifies as a
    /// breakout, oldest first.
    fn breakout_days(&self, frame: &IndicatorFrame<'_>) -> Result<Vec<BreakoutDay>, FrameError> {
        let cfg = &self.config;
        let bars = frame.bars();
        let closes = frame.column("close")?;
        let volumes = frame.column("volume")?;
        let pct = frame.column("pct_chg")?;
        let j = frame.column("J")?;
        let n = bars.len();
        let j_floor = j[n - 1] - J_HOLD_MARGIN;

        let mut days = Vec::new();
        for t in n.saturating_sub(cfg.offset + 1)..n - 1 {
            if pct[t].is_nan() || pct[t] < cfg.up_threshold {
                continue;
            }
            let vol_t = volumes[t];
            if vol_t.is_nan() || vol_t <= 0.0 {
                continue;
            }
            let dominant = volumes
                .iter()
                .enumerate()
                .all(|(i, &v)| i == t || v <= cfg.volume_threshold * vol_t);
            if !dominant {
                continue;
            }
            if !closes[..t].iter().all(|&c| closes[t] > c) {
                continue;
            }
            if !j[t..n - 1].iter().all(|&v| v > j_floor) {
                continue;
            }
            days.push(BreakoutDay {
                date: bars[t].date,
                pct_chg: pct[t],
            });
        }
        Ok(days)
    }
}

impl Selector for BreakoutVolumeKdjSelector {
    fn name(&self) -> &str {
        "BreakoutVolumeKDJSelector"
    }

    fn history_len(&self) -> Option<usize> {
        None
    }

    fn evaluate(&self, hist: &[Bar]) -> Result<Evaluation, FrameError> {
        let cfg = &self.config;
        let mut eval = Evaluation::default();
        if !eval.record(history_gate(hist.len(), cfg.offset + 2)) {
            return Ok(eval);
        }

        let window = tail(hist, cfg.max_window);
        let frame = IndicatorFrame::new(window)
            .with_kdj(KDJ_PERIOD)
            .with_pct_change()
            .with_dif(DIF_FAST, DIF_SLOW);

        let closes = frame.column("close")?;
        if !eval.record(price_range_gate(Gate::PriceRange, closes, cfg.price_range_pct)) {
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

        let days = self.breakout_days(&frame)?;
        let passed = !days.is_empty();
        let record = GateRecord::new(Gate::Breakout, days.len() as f64, cfg.up_threshold, passed)
            .with_detail(GateDetail::Breakouts { days });
        if !eval.record(record) {
            return Ok(eval);
        }

        Ok(eval.accept())
    }
}
