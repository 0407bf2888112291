//! Structured explanations of selector decisions.
//!
//! Selectors record one [`GateRecord`] per gate they check, in the order they
//! check them, and stop at the first failing gate. Text is produced only by the
//! `Display` impls, so callers that want machine-readable output can serialize
//! the records instead.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// Rendered in place of gate text when a symbol did not pass.
pub const NOT_SELECTED: &str = "did not pass screening";

/// Which check a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    History,
    PriceRange,
    BbiUptrend,
    JValue,
    Dif,
    PriorPattern,
    Consolidation,
    PriceDrop,
    Peaks,
    TargetPeak,
    Fluctuation,
    RsvLong,
    RsvShort,
    Breakout,
}

/// One qualifying breakout day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakoutDay {
    pub date: NaiveDate,
    pub pct_chg: f64,
}

/// Extra structured context for a gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateDetail {
    /// Quantile level and the value it produced.
    Quantile { q: f64, value: f64 },
    /// Allowed share of negative steps and the window range searched.
    Trend { q: f64, max_window: Option<usize> },
    /// A date the gate located.
    Date { date: NaiveDate },
    /// Summary of an RSV window.
    Rsv {
        period: usize,
        first: f64,
        last: f64,
        min: f64,
        max: f64,
    },
    /// Every breakout day that qualified.
    Breakouts { days: Vec<BreakoutDay> },
}

/// Outcome of a single gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateRecord {
    pub gate: Gate,
    /// Measured value (NaN when nothing could be measured).
    pub value: f64,
    pub threshold: f64,
    pub passed: bool,
    pub detail: Option<GateDetail>,
}

impl GateRecord {
    pub fn new(gate: Gate, value: f64, threshold: f64, passed: bool) -> Self {
        Self {
            gate,
            value,
            threshold,
            passed,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: GateDetail) -> Self {
        self.detail = Some(detail);
        self
    }
}

fn mark(passed: bool) -> &'static str {
    if passed {
        "✓"
    } else {
        "✗"
    }
}

impl fmt::Display for GateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ok = mark(self.passed);
        match (self.gate, &self.detail) {
            (Gate::History, _) => write!(
                f,
                "history: {} bars (needs {}) {ok}",
                self.value, self.threshold
            ),
            (Gate::PriceRange, _) => write!(
                f,
                "price range: {:.2}% (<= {:.1}%) {ok}",
                self.value * 100.0,
                self.threshold * 100.0
            ),
            (Gate::BbiUptrend, Some(GateDetail::Trend { q, .. })) if self.passed => write!(
                f,
                "BBI uptrend over {} bars (tolerating {:.1}% pullbacks) {ok}",
                self.value,
                q * 100.0
            ),
            (Gate::BbiUptrend, Some(GateDetail::Trend { q, max_window })) => {
                write!(f, "BBI uptrend: none from {} bars", self.threshold)?;
                if let Some(m) = max_window {
                    write!(f, " up to {m}")?;
                }
                write!(f, " (tolerating {:.1}% pullbacks) {ok}", q * 100.0)
            }
            (Gate::BbiUptrend, _) => write!(f, "BBI uptrend {ok}"),
            (Gate::JValue, detail) => {
                write!(f, "J: {:.2}", self.value)?;
                if self.value < self.threshold {
                    write!(f, " < {} ✓", self.threshold)?;
                }
                match detail {
                    Some(GateDetail::Quantile { q, value }) if self.value <= *value => {
                        write!(f, " <= {:.2} ({:.0}% quantile) ✓", value, q * 100.0)
                    }
                    Some(GateDetail::Quantile { q, value }) if !self.passed => write!(
                        f,
                        " (needs < {} or <= {:.2} at {:.0}% quantile) ✗",
                        self.threshold,
                        value,
                        q * 100.0
                    ),
                    _ if !self.passed => write!(f, " ✗"),
                    _ => Ok(()),
                }
            }
            (Gate::Dif, _) if self.passed => write!(f, "DIF: {:.4} > 0 ✓", self.value),
            (Gate::Dif, _) => write!(f, "DIF: {:.4} <= 0 ✗", self.value),
            (Gate::PriorPattern, Some(GateDetail::Date { date })) => {
                write!(f, "B1 pattern on {date} {ok}")
            }
            (Gate::PriorPattern, _) => write!(
                f,
                "B1 pattern: none in the last {} bars {ok}",
                self.threshold
            ),
            (Gate::Consolidation, _) => write!(
                f,
                "consolidation range: {:.2}% (<= {:.1}%) {ok}",
                self.value * 100.0,
                self.threshold * 100.0
            ),
            (Gate::PriceDrop, _) => write!(
                f,
                "drop today: {:.2}% (>= {:.1}%) {ok}",
                self.value * 100.0,
                self.threshold * 100.0
            ),
            (Gate::Peaks, _) => write!(
                f,
                "peaks before today: {} (needs {}) {ok}",
                self.value, self.threshold
            ),
            (Gate::TargetPeak, Some(GateDetail::Date { date })) => {
                write!(f, "target peak {date} (oc_max {:.2}) {ok}", self.value)
            }
            (Gate::TargetPeak, _) => write!(f, "target peak: none qualifies {ok}"),
            (Gate::Fluctuation, _) => write!(
                f,
                "fluctuation vs target peak: {:.2}% (<= {:.1}%) {ok}",
                self.value * 100.0,
                self.threshold * 100.0
            ),
            (
                Gate::RsvLong,
                Some(GateDetail::Rsv {
                    period, min, max, ..
                }),
            ) => write!(
                f,
                "long RSV({period}) all >= {}: range {min:.1}-{max:.1} {ok}",
                self.threshold
            ),
            (
                Gate::RsvShort,
                Some(GateDetail::Rsv {
                    period,
                    first,
                    last,
                    min,
                    ..
                }),
            ) => write!(
                f,
                "short RSV({period}): ends {first:.1}->{last:.1}, low {min:.1} {ok}"
            ),
            (Gate::RsvLong | Gate::RsvShort, _) => write!(f, "RSV window {ok}"),
            (Gate::Breakout, Some(GateDetail::Breakouts { days })) if !days.is_empty() => {
                write!(f, "breakout days: ")?;
                for (i, day) in days.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} (+{:.1}%)", day.date, day.pct_chg)?;
                }
                write!(f, " {ok}")
            }
            (Gate::Breakout, _) => write!(f, "breakout: no qualifying day {ok}"),
        }
    }
}

/// Result of running a selector on one history.
///
/// `passed` starts false; a selector calls [`Evaluation::accept`] only after
/// every gate held.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub passed: bool,
    pub gates: Vec<GateRecord>,
}

impl Evaluation {
    /// Append a gate and report whether it held.
    pub fn record(&mut self, gate: GateRecord) -> bool {
        let passed = gate.passed;
        self.gates.push(gate);
        passed
    }

    pub fn accept(mut self) -> Self {
        self.passed = true;
        self
    }

    pub fn gate(&self, gate: Gate) -> Option<&GateRecord> {
        self.gates.iter().find(|g| g.gate == gate)
    }
}

/// Why a symbol was (or was not) picked on a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub symbol: String,
    pub date: NaiveDate,
    pub selector: String,
    pub passed: bool,
    pub gates: Vec<GateRecord>,
}

impl Explanation {
    pub fn new(symbol: &str, date: NaiveDate, selector: &str, evaluation: Evaluation) -> Self {
        Self {
            symbol: symbol.to_string(),
            date,
            selector: selector.to_string(),
            passed: evaluation.passed,
            gates: evaluation.gates,
        }
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.passed {
            return f.write_str(NOT_SELECTED);
        }
        for (i, gate) in self.gates.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{gate}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn record_tracks_gate_outcome() {
        let mut eval = Evaluation::default();
        assert!(eval.record(GateRecord::new(Gate::Dif, 0.3, 0.0, true)));
        assert!(!eval.record(GateRecord::new(Gate::PriceRange, 2.0, 1.0, false)));
        assert_eq!(eval.gates.len(), 2);
        assert!(!eval.passed);
        assert!(eval.gate(Gate::Dif).is_some());
        assert!(eval.gate(Gate::JValue).is_none());
        assert!(eval.accept().passed);
    }

    #[test]
    fn explanation_joins_gates() {
        let mut eval = Evaluation::default();
        eval.record(GateRecord::new(Gate::PriceRange, 0.1234, 1.0, true));
        eval.record(GateRecord::new(Gate::Dif, 0.25, 0.0, true));
        let ex = Explanation::new("000001", date(6), "BBIKDJSelector", eval.accept());
        assert_eq!(
            ex.to_string(),
            "price range: 12.34% (<= 100.0%) ✓; DIF: 0.2500 > 0 ✓"
        );
    }

    #[test]
    fn failed_explanation_renders_sentinel() {
        let mut eval = Evaluation::default();
        eval.record(GateRecord::new(Gate::Dif, -0.1, 0.0, false));
        let ex = Explanation::new("000001", date(6), "BBIKDJSelector", eval);
        assert_eq!(ex.to_string(), NOT_SELECTED);
    }

    #[test]
    fn j_gate_text_lists_both_conditions() {
        let rec = GateRecord::new(Gate::JValue, -7.5, -5.0, true)
            .with_detail(GateDetail::Quantile { q: 0.1, value: 3.2 });
        assert_eq!(rec.to_string(), "J: -7.50 < -5 ✓ <= 3.20 (10% quantile) ✓");

        let rec = GateRecord::new(Gate::JValue, 12.0, -5.0, false)
            .with_detail(GateDetail::Quantile { q: 0.1, value: 3.2 });
        assert!(rec.to_string().ends_with("✗"));
    }

    #[test]
    fn breakout_lists_every_day() {
        let rec = GateRecord::new(Gate::Breakout, 2.0, 3.0, true).with_detail(
            GateDetail::Breakouts {
                days: vec![
                    BreakoutDay {
                        date: date(2),
                        pct_chg: 5.12,
                    },
                    BreakoutDay {
                        date: date(3),
                        pct_chg: 4.0,
                    },
                ],
            },
        );
        assert_eq!(
            rec.to_string(),
            "breakout days: 2024-05-02 (+5.1%), 2024-05-03 (+4.0%) ✓"
        );
    }

    #[test]
    fn explanation_serializes_to_json() {
        let mut eval = Evaluation::default();
        eval.record(
            GateRecord::new(Gate::PriorPattern, f64::NAN, 60.0, true)
                .with_detail(GateDetail::Date { date: date(1) }),
        );
        let ex = Explanation::new("600000", date(6), "SuperB1Selector", eval.accept());
        let json = serde_json::to_value(&ex).unwrap();
        assert_eq!(json["gates"][0]["gate"], "prior_pattern");
        assert_eq!(json["gates"][0]["detail"]["kind"], "date");
        assert!(json["gates"][0]["value"].is_null());
    }
}
