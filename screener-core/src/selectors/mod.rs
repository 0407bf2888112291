//! Pattern selectors.
//!
//! Each selector composes indicators, trend detection and peak extraction into
//! a multi-stage filter over one symbol's history. Selectors are immutable
//! after construction and never see more than the slice they are given: the
//! last bar of that slice is "today".
//!
//! # Architecture invariant
//! Selectors hold no state between calls and share nothing across symbols, so
//! the driver is free to evaluate symbols in parallel.

pub mod bbi_kdj;
pub mod bbi_short_long;
pub mod breakout_volume_kdj;
pub mod peak_kdj;
pub mod super_b1;

pub use bbi_kdj::{BbiKdjConfig, BbiKdjSelector};
pub use bbi_short_long::{BbiShortLongConfig, BbiShortLongSelector};
pub use breakout_volume_kdj::{BreakoutVolumeKdjConfig, BreakoutVolumeKdjSelector};
pub use peak_kdj::{PeakKdjConfig, PeakKdjSelector};
pub use super_b1::{SuperB1Config, SuperB1Selector};

use crate::domain::Bar;
use crate::error::{ConfigError, FrameError};
use crate::explain::{Evaluation, Gate, GateDetail, GateRecord};
use crate::stats::{min_max, quantile};
use crate::trend::{check_quantile, search_windows};

/// Trait for pattern selectors.
pub trait Selector: Send + Sync {
    /// Strategy class name (e.g. "BBIKDJSelector").
    fn name(&self) -> &str;

    /// Trailing bars the driver keeps before evaluating; `None` keeps the
    /// full history up to the date.
    fn history_len(&self) -> Option<usize>;

    /// Series shorter than this (after truncation) are skipped by the driver.
    fn min_bars(&self) -> usize {
        1
    }

    /// Run every gate in order against `hist`, whose last bar is today.
    ///
    /// Stops at the first failing gate. Insufficient data is a failed gate,
    /// not an error; `Err` is reserved for missing frame columns.
    fn evaluate(&self, hist: &[Bar]) -> Result<Evaluation, FrameError>;

    fn passes(&self, hist: &[Bar]) -> Result<bool, FrameError> {
        Ok(self.evaluate(hist)?.passed)
    }
}

// ─── Shared gates ────────────────────────────────────────────────────

/// `max/min - 1 <= limit` over the given closes; a non-positive minimum fails.
pub(crate) fn price_range_gate(gate: Gate, closes: &[f64], limit: f64) -> GateRecord {
    match min_max(closes) {
        Some((lo, hi)) if lo > 0.0 => {
            let range = hi / lo - 1.0;
            GateRecord::new(gate, range, limit, range <= limit)
        }
        _ => GateRecord::new(gate, f64::NAN, limit, false),
    }
}

/// `J_today < j_threshold` or `J_today <=` the `q` quantile of `window`.
/// An empty window fails.
pub(crate) fn j_gate(j_today: f64, window: &[f64], j_threshold: f64, q: f64) -> GateRecord {
    match quantile(window, q) {
        Some(qv) => {
            let passed = j_today < j_threshold || j_today <= qv;
            GateRecord::new(Gate::JValue, j_today, j_threshold, passed)
                .with_detail(GateDetail::Quantile { q, value: qv })
        }
        None => GateRecord::new(Gate::JValue, j_today, j_threshold, false),
    }
}

pub(crate) fn dif_gate(dif_today: f64) -> GateRecord {
    GateRecord::new(Gate::Dif, dif_today, 0.0, dif_today > 0.0)
}

pub(crate) fn bbi_gate(
    bbi: &[f64],
    min_window: usize,
    max_window: Option<usize>,
    q: f64,
) -> GateRecord {
    let detail = GateDetail::Trend { q, max_window };
    match search_windows(bbi, min_window, max_window, q) {
        Some(w) => GateRecord::new(Gate::BbiUptrend, w as f64, min_window as f64, true),
        None => GateRecord::new(Gate::BbiUptrend, f64::NAN, min_window as f64, false),
    }
    .with_detail(detail)
}

/// At least `required` bars are available.
pub(crate) fn history_gate(available: usize, required: usize) -> GateRecord {
    GateRecord::new(
        Gate::History,
        available as f64,
        required as f64,
        available >= required,
    )
}

// ─── Config validation helpers ───────────────────────────────────────

pub(crate) fn check_window(
    field: &'static str,
    value: usize,
    min: usize,
) -> Result<(), ConfigError> {
    if value >= min {
        Ok(())
    } else {
        Err(ConfigError::InvalidWindow {
            field,
            value,
            expected: match min {
                1 => ">= 1",
                2 => ">= 2",
                _ => "too small",
            },
        })
    }
}

pub(crate) fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    check_quantile(field, value)
}

/// Strictly inside (0, 1).
pub(crate) fn check_open_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "0 < x < 1",
        })
    }
}

pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "finite and >= 0",
        })
    }
}

pub(crate) fn check_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "finite",
        })
    }
}
