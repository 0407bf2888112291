//! Prior BBIKDJ pattern, consolidation, then a drop day with J in its low tail.
//!
//! Gates, in order:
//! 1. enough history (`lookback_n + inner.max_window + 20` bars);
//! 2. backward search, newest first, over the `lookback_n` bars before today
//!    for a date `t_m` where the inner BBIKDJ selector passes on the history
//!    ending at `t_m`, and the closes from `t_m` to yesterday (at least 3 bars)
//!    stay within `close_vol_pct`;
//! 3. today's drop versus yesterday's close of at least `price_drop_pct`;
//! 4. J gate over the trailing `lookback_n` bars.

use serde::{Deserialize, Serialize};

use super::bbi_kdj::HISTORY_BUFFER;
use super::{
    check_finite, check_open_unit, check_unit, check_window, history_gate, j_gate,
    price_range_gate, BbiKdjConfig, BbiKdjSelector, Selector,
};
use crate::domain::Bar;
use crate::error::{ConfigError, FrameError};
use crate::explain::{Evaluation, Gate, GateDetail, GateRecord};
use crate::frame::{IndicatorFrame, KDJ_PERIOD};

/// Bars in the consolidation span `[t_m, today - 1]`, at minimum.
const MIN_CONSOLIDATION_BARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuperB1Config {
    pub lookback_n: usize,
    pub close_vol_pct: f64,
    pub price_drop_pct: f64,
    pub j_threshold: f64,
    pub j_q_threshold: f64,
    /// Configuration of the wrapped BBIKDJ selector. Required.
    #[serde(alias = "B1_params")]
    pub b1: Option<BbiKdjConfig>,
}

impl Default for SuperB1Config {
    fn default() -> Self {
        Self {
            lookback_n: 60,
            close_vol_pct: 0.05,
            price_drop_pct: 0.03,
            j_threshold: -5.0,
            j_q_threshold: 0.10,
            b1: None,
        }
    }
}

impl SuperB1Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_window("lookback_n", self.lookback_n, 2)?;
        check_open_unit("close_vol_pct", self.close_vol_pct)?;
        check_open_unit("price_drop_pct", self.price_drop_pct)?;
        check_finite("j_threshold", self.j_threshold)?;
        check_unit("j_q_threshold", self.j_q_threshold)?;
        match &self.b1 {
            Some(inner) => inner.validate(),
            None => Err(ConfigError::MissingNested {
                selector: "SuperB1Selector",
                field: "b1",
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuperB1Selector {
    config: SuperB1Config,
    inner: BbiKdjSelector,
}

impl SuperB1Selector {
    pub fn new(config: SuperB1Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let inner_config = config.b1.clone().ok_or(ConfigError::MissingNested {
            selector: "SuperB1Selector",
            field: "b1",
        })?;
        let inner = BbiKdjSelector::new(inner_config)?;
        Ok(Self { config, inner })
    }

    pub fn inner(&self) -> &BbiKdjSelector {
        &self.inner
    }

    fn required_bars(&self) -> usize {
        self.config.lookback_n + self.inner.config().max_window + HISTORY_BUFFER
    }

    /// Newest candidate index whose inner pattern and consolidation both hold,
    /// with the consolidation range.
    fn find_prior_pattern(&self, hist: &[Bar]) -> Result<Option<(usize, f64)>, FrameError> {
        let n = hist.len();
        let yesterday = n - 2;
        let earliest = yesterday.saturating_sub(self.config.lookback_n - 1);

        for t_m in (earliest..=yesterday).rev() {
            if !self.inner.passes(&hist[..=t_m])? {
                continue;
            }
            if yesterday + 1 - t_m < MIN_CONSOLIDATION_BARS {
                continue;
            }
            let span: Vec<f64> = hist[t_m..=yesterday].iter().map(|b| b.close).collect();
            let gate = price_range_gate(Gate::Consolidation, &span, self.config.close_vol_pct);
            if gate.passed {
                return Ok(Some((t_m, gate.value)));
            }
        }
        Ok(None)
    }
}

impl Selector for SuperB1Selector {
    fn name(&self) -> &str {
        "SuperB1Selector"
    }

    fn history_len(&self) -> Option<usize> {
        Some(self.required_bars())
    }

    fn min_bars(&self) -> usize {
        self.required_bars()
    }

    fn evaluate(&self, hist: &[Bar]) -> Result<Evaluation, FrameError> {
        let cfg = &self.config;
        let mut eval = Evaluation::default();

        let required = self.required_bars().max(2);
        if !eval.record(history_gate(hist.len(), required)) {
            return Ok(eval);
        }

        let Some((t_m, vol)) = self.find_prior_pattern(hist)? else {
            eval.record(GateRecord::new(
                Gate::PriorPattern,
                f64::NAN,
                cfg.lookback_n as f64,
                false,
            ));
            return Ok(eval);
        };
        eval.record(
            GateRecord::new(Gate::PriorPattern, t_m as f64, cfg.lookback_n as f64, true)
                .with_detail(GateDetail::Date {
                    date: hist[t_m].date,
                }),
        );
        eval.record(GateRecord::new(
            Gate::Consolidation,
            vol,
            cfg.close_vol_pct,
            true,
        ));

        let n = hist.len();
        let prev = hist[n - 2].close;
        let today = hist[n - 1].close;
        let drop = if prev > 0.0 {
            (prev - today) / prev
        } else {
            f64::NAN
        };
        if !eval.record(GateRecord::new(
            Gate::PriceDrop,
            drop,
            cfg.price_drop_pct,
            drop >= cfg.price_drop_pct,
        )) {
            return Ok(eval);
        }

        let frame = IndicatorFrame::new(hist).with_kdj(KDJ_PERIOD);
        let j_window = frame.tail("J", cfg.lookback_n)?;
        if !eval.record(j_gate(
            frame.last("J")?,
            j_window,
            cfg.j_threshold,
            cfg.j_q_threshold,
        )) {
            return Ok(eval);
        }

        Ok(eval.accept())
    }
}
