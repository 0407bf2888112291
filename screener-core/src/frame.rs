//! Named indicator columns over a bar slice.
//!
//! A frame is built per evaluation from exactly the history it is handed, so
//! every derived column is causal with respect to that slice. Base price
//! columns (`open`, `high`, `low`, `close`, `volume`) are always present;
//! derived columns are attached with the `with_*` builders.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::Bar;
use crate::error::FrameError;
use crate::indicators::{
    compute_bbi, compute_dif, compute_kdj, compute_macd, compute_rsv, pct_change, Indicator,
    MacdParams, Sma,
};

/// Base price columns present in every frame.
pub const BASE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Window of the KDJ oscillator used throughout the selectors.
pub const KDJ_PERIOD: usize = 9;

#[derive(Debug, Clone)]
pub struct IndicatorFrame<'a> {
    bars: &'a [Bar],
    columns: HashMap<String, Vec<f64>>,
}

impl<'a> IndicatorFrame<'a> {
    /// Frame with the base price columns of `bars`.
    pub fn new(bars: &'a [Bar]) -> Self {
        let mut frame = Self {
            bars,
            columns: HashMap::new(),
        };
        frame.insert("open", bars.iter().map(|b| b.open).collect());
        frame.insert("high", bars.iter().map(|b| b.high).collect());
        frame.insert("low", bars.iter().map(|b| b.low).collect());
        frame.insert("close", bars.iter().map(|b| b.close).collect());
        frame.insert("volume", bars.iter().map(|b| b.volume).collect());
        frame
    }

    /// Insert (or replace) a named column. Must match the frame length.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.bars.len(), "column length mismatch");
        self.columns.insert(name.into(), values);
    }

    // ─── Builders ────────────────────────────────────────────────────

    /// Attach the output of any single-series indicator under its own name.
    pub fn with_indicator(mut self, indicator: &dyn Indicator) -> Self {
        let values = indicator.compute(self.bars);
        self.insert(indicator.name().to_string(), values);
        self
    }

    /// Attach `K`, `D`, `J`.
    pub fn with_kdj(mut self, period: usize) -> Self {
        let kdj = compute_kdj(self.bars, period);
        self.insert("K", kdj.k);
        self.insert("D", kdj.d);
        self.insert("J", kdj.j);
        self
    }

    /// Attach `BBI`.
    pub fn with_bbi(mut self) -> Self {
        let bbi = compute_bbi(self.bars);
        self.insert("BBI", bbi);
        self
    }

    /// Attach `DIF` over close.
    pub fn with_dif(mut self, fast: usize, slow: usize) -> Self {
        let dif = compute_dif(self.bars, fast, slow);
        self.insert("DIF", dif);
        self
    }

    /// Attach `DIF`, `DEA`, `MACD`.
    pub fn with_macd(mut self, params: &MacdParams) -> Self {
        let macd = compute_macd(self.bars, params);
        self.insert("DIF", macd.dif);
        self.insert("DEA", macd.dea);
        self.insert("MACD", macd.macd);
        self
    }

    /// Attach `RSV_<period>`.
    pub fn with_rsv(mut self, period: usize) -> Self {
        let rsv = compute_rsv(self.bars, period);
        self.insert(format!("RSV_{period}"), rsv);
        self
    }

    /// Attach `pct_chg` (close-to-close percent change).
    pub fn with_pct_change(mut self) -> Self {
        let closes: Vec<f64> = self.bars.iter().map(|b| b.close).collect();
        self.insert("pct_chg", pct_change(&closes));
        self
    }

    /// Attach `oc_max`, the candle body top.
    pub fn with_oc_max(mut self) -> Self {
        let oc_max = self.bars.iter().map(Bar::body_top).collect();
        self.insert("oc_max", oc_max);
        self
    }

    /// The chart indicator set: BBI, DIF/DEA/MACD and K/D/J.
    pub fn with_chart_indicators(self) -> Self {
        self.with_bbi()
            .with_macd(&MacdParams::default())
            .with_kdj(KDJ_PERIOD)
    }

    /// Attach `MA<w>` for every window above 1 that the history can fill.
    pub fn with_moving_averages(mut self, windows: &[usize]) -> Self {
        for &w in windows {
            if w > 1 && self.bars.len() >= w {
                let sma = Sma::new(w);
                let values = sma.compute(self.bars);
                self.insert(sma.name().to_string(), values);
            }
        }
        self
    }

    // ─── Accessors ───────────────────────────────────────────────────

    /// Full series for a named column.
    pub fn column(&self, name: &str) -> Result<&[f64], FrameError> {
        self.columns
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| FrameError::MissingColumn {
                column: name.to_string(),
                available: self.column_names(),
            })
    }

    /// Value of a column at the last bar (NaN for an empty frame).
    pub fn last(&self, name: &str) -> Result<f64, FrameError> {
        Ok(self.column(name)?.last().copied().unwrap_or(f64::NAN))
    }

    /// Trailing `n` values of a column (all of them when fewer exist).
    pub fn tail(&self, name: &str, n: usize) -> Result<&[f64], FrameError> {
        let col = self.column(name)?;
        Ok(&col[col.len().saturating_sub(n)..])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names, base columns first, derived ones sorted.
    pub fn column_names(&self) -> Vec<String> {
        let mut derived: Vec<&String> = self
            .columns
            .keys()
            .filter(|k| !BASE_COLUMNS.contains(&k.as_str()))
            .collect();
        derived.sort();
        BASE_COLUMNS
            .iter()
            .filter(|c| self.columns.contains_key(**c))
            .map(|c| c.to_string())
            .chain(derived.into_iter().cloned())
            .collect()
    }

    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.bars.get(index).map(|b| b.date)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
