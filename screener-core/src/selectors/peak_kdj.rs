//! Retest of an earlier peak's level with J in its low tail.
//!
//! Peaks are taken on `oc_max` (the candle body top) with distance 6 and
//! prominence 0.5, excluding today. The newest peak is the reference; the
//! search walks older peaks for the first one it clears by a real trough.

use serde::{Deserialize, Serialize};

use super::bbi_kdj::HISTORY_BUFFER;
use super::{check_finite, check_non_negative, check_unit, check_window, j_gate, Selector};
use crate::domain::Bar;
use crate::error::{ConfigError, FrameError};
use crate::explain::{Evaluation, Gate, GateDetail, GateRecord};
use crate::frame::{IndicatorFrame, KDJ_PERIOD};
use crate::peaks::{find_peaks_in, Peak, PeakParams};

const PEAK_DISTANCE: usize = 6;
const PEAK_PROMINENCE: f64 = 0.5;
const MIN_PEAKS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeakKdjConfig {
    pub j_threshold: f64,
    pub max_window: usize,
    /// Allowed distance of today's close from the target peak's close, as a ratio.
    pub fluc_threshold: f64,
    /// Required height of the target peak over the trough that follows it.
    pub gap_threshold: f64,
    pub j_q_threshold: f64,
}

impl Default for PeakKdjConfig {
    fn default() -> Self {
        Self {
            j_threshold: -5.0,
            max_window: 90,
            fluc_threshold: 0.03,
            gap_threshold: 0.02,
            j_q_threshold: 0.10,
        }
    }
}

impl PeakKdjConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("j_threshold", self.j_threshold)?;
        check_window("max_window", self.max_window, 1)?;
        check_non_negative("fluc_threshold", self.fluc_threshold)?;
        check_non_negative("gap_threshold", self.gap_threshold)?;
        check_unit("j_q_threshold", self.j_q_threshold)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PeakKdjSelector {
    config: PeakKdjConfig,
}

impl PeakKdjSelector {
    pub fn new(config: PeakKdjConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PeakKdjConfig {
        &self.config
    }

    /// Newest earlier peak that sits below the reference peak, above every
    /// peak between the two, and clear of the lowest close in between by
    /// `gap_threshold`.
    fn find_target<'p>(&self, peaks: &'p [Peak], closes: &[f64]) -> Option<&'p Peak> {
        let (reference, earlier) = peaks.split_last()?;
        let total = peaks.len();

        for idx in (0..earlier.len()).rev() {
            let prev = &peaks[idx];
            if reference.value <= prev.value {
                continue;
            }
            if total >= 3 && idx < total - 2 {
                let between = &peaks[idx + 1..total - 1];
                if !between.iter().all(|p| p.value < prev.value) {
                    continue;
                }
            }
            let trough = closes[prev.index + 1..reference.index]
                .iter()
                .copied()
                .min_by(f64::total_cmp);
            match trough {
                Some(low) if prev.value > low * (1.0 + self.config.gap_threshold) => {
                    return Some(prev)
                }
                _ => continue,
            }
        }
        None
    }
}

impl Selector for PeakKdjSelector {
    fn name(&self) -> &str {
        "PeakKDJSelector"
    }

    fn history_len(&self) -> Option<usize> {
        Some(self.config.max_window + HISTORY_BUFFER)
    }

    fn evaluate(&self, hist: &[Bar]) -> Result<Evaluation, FrameError> {
        let cfg = &self.config;
        let mut eval = Evaluation::default();
        let n = hist.len();
        if n == 0 {
            eval.record(GateRecord::new(Gate::Peaks, 0.0, MIN_PEAKS as f64, false));
            return Ok(eval);
        }

        let frame = IndicatorFrame::new(hist).with_oc_max().with_kdj(KDJ_PERIOD);
        let params = PeakParams {
            distance: Some(PEAK_DISTANCE),
            prominence: Some(PEAK_PROMINENCE),
            ..PeakParams::default()
        };
        let mut peaks = find_peaks_in(&frame, "oc_max", &params)?;
        peaks.retain(|p| p.index < n - 1);
        if !eval.record(GateRecord::new(
            Gate::Peaks,
            peaks.len() as f64,
            MIN_PEAKS as f64,
            peaks.len() >= MIN_PEAKS,
        )) {
            return Ok(eval);
        }

        let closes = frame.column("close")?;
        let Some(target) = self.find_target(&peaks, closes) else {
            eval.record(GateRecord::new(
                Gate::TargetPeak,
                f64::NAN,
                cfg.gap_threshold,
                false,
            ));
            return Ok(eval);
        };
        let target_close = closes[target.index];
        let mut record = GateRecord::new(Gate::TargetPeak, target.value, cfg.gap_threshold, true);
        if let Some(date) = target.date {
            record = record.with_detail(GateDetail::Date { date });
        }
        eval.record(record);

        let fluc = if target_close > 0.0 {
            (closes[n - 1] - target_close).abs() / target_close
        } else {
            f64::NAN
        };
        if !eval.record(GateRecord::new(
            Gate::Fluctuation,
            fluc,
            cfg.fluc_threshold,
            fluc <= cfg.fluc_threshold,
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

        Ok(eval.accept())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::testing::tight_bars;

    /// `n` evenly spaced values from `a` toward `b`, excluding `b`.
    fn seg(a: f64, b: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| a + (b - a) * i as f64 / n as f64).collect()
    }

    fn config() -> PeakKdjConfig {
        PeakKdjConfig {
            j_q_threshold: 0.5,
            ..PeakKdjConfig::default()
        }
    }

    /// Peak at 30 (15.0), trough 12.5, higher peak at 85 (16.5), then a
    /// pullback to 15.3 today.
    fn retest_bars() -> Vec<Bar> {
        let mut closes = seg(12.0, 15.0, 30);
        closes.extend(seg(15.0, 12.5, 25));
        closes.extend(seg(12.5, 16.5, 30));
        closes.extend(seg(16.5, 15.9, 10));
        closes.extend([15.9; 14]);
        closes.push(15.3);
        tight_bars(&closes)
    }

    fn target_date(eval: &Evaluation) -> chrono::NaiveDate {
        match &eval.gate(Gate::TargetPeak).unwrap().detail {
            Some(GateDetail::Date { date }) => *date,
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn retest_of_prior_peak_passes() {
        let bars = retest_bars();
        assert_eq!(bars.len(), 110);
        let sel = PeakKdjSelector::new(config()).unwrap();
        let eval = sel.evaluate(&bars).unwrap();
        assert!(eval.passed, "{:?}", eval.gates);
        assert_eq!(eval.gate(Gate::Peaks).unwrap().value, 2.0);
        assert_eq!(target_date(&eval), bars[30].date);
        let fluc = eval.gate(Gate::Fluctuation).unwrap();
        assert!((fluc.value - 0.02).abs() < 1e-9);
    }

    #[test]
    fn j_tail_gate_can_still_reject() {
        let sel = PeakKdjSelector::new(PeakKdjConfig {
            j_q_threshold: 0.3,
            ..config()
        })
        .unwrap();
        let eval = sel.evaluate(&retest_bars()).unwrap();
        assert!(!eval.passed);
        assert_eq!(eval.gates.last().unwrap().gate, Gate::JValue);
    }

    #[test]
    fn fluctuation_limit() {
        let sel = PeakKdjSelector::new(PeakKdjConfig {
            fluc_threshold: 0.01,
            ..config()
        })
        .unwrap();
        let eval = sel.evaluate(&retest_bars()).unwrap();
        assert!(!eval.passed);
        assert_eq!(eval.gates.last().unwrap().gate, Gate::Fluctuation);
    }

    #[test]
    fn shallow_trough_has_no_target() {
        let sel = PeakKdjSelector::new(PeakKdjConfig {
            gap_threshold: 0.25,
            ..config()
        })
        .unwrap();
        let eval = sel.evaluate(&retest_bars()).unwrap();
        let last = eval.gates.last().unwrap();
        assert_eq!(last.gate, Gate::TargetPeak);
        assert!(!last.passed);
    }

    #[test]
    fn newest_qualifying_peak_is_the_target() {
        let mut closes = seg(12.0, 15.0, 20);
        closes.extend(seg(15.0, 12.5, 12));
        closes.extend(seg(12.5, 15.5, 15));
        closes.extend(seg(15.5, 12.8, 12));
        closes.extend(seg(12.8, 16.5, 26));
        closes.extend(seg(16.5, 15.9, 10));
        closes.extend([15.9; 14]);
        closes.push(15.3);
        let bars = tight_bars(&closes);

        let sel = PeakKdjSelector::new(config()).unwrap();
        let eval = sel.evaluate(&bars).unwrap();
        assert!(eval.passed, "{:?}", eval.gates);
        assert_eq!(eval.gate(Gate::Peaks).unwrap().value, 3.0);
        assert_eq!(target_date(&eval), bars[47].date);
    }

    /// Peaks at 20 (`first`), 47 (15.5, followed by a shallow dip) and 85 (16.5).
    fn skip_bars(first: f64) -> Vec<Bar> {
        let mut closes = seg(12.0, first, 20);
        closes.extend(seg(first, 12.5, 12));
        closes.extend(seg(12.5, 15.5, 15));
        closes.extend(seg(15.5, 14.9, 6));
        closes.extend(seg(14.9, 16.5, 32));
        closes.extend(seg(16.5, 15.9, 10));
        closes.extend([15.9; 14]);
        closes.push(15.6);
        tight_bars(&closes)
    }

    #[test]
    fn older_target_must_top_the_peaks_after_it() {
        let cfg = PeakKdjConfig {
            gap_threshold: 0.05,
            ..config()
        };
        let sel = PeakKdjSelector::new(cfg).unwrap();

        // middle peak fails the gap, the older, higher one qualifies
        let bars = skip_bars(16.0);
        let eval = sel.evaluate(&bars).unwrap();
        assert!(eval.passed, "{:?}", eval.gates);
        assert_eq!(target_date(&eval), bars[20].date);

        // older peak sits below the middle one
        let eval = sel.evaluate(&skip_bars(15.2)).unwrap();
        assert!(!eval.passed);
        assert_eq!(eval.gates.last().unwrap().gate, Gate::TargetPeak);
    }

    #[test]
    fn lower_reference_peak_has_no_target() {
        let mut closes = seg(12.0, 16.5, 30);
        closes.extend(seg(16.5, 12.5, 25));
        closes.extend(seg(12.5, 15.0, 30));
        closes.extend(seg(15.0, 14.0, 24));
        closes.push(13.5);
        let eval = PeakKdjSelector::new(config())
            .unwrap()
            .evaluate(&tight_bars(&closes))
            .unwrap();
        assert!(!eval.passed);
        assert_eq!(eval.gates.last().unwrap().gate, Gate::TargetPeak);
    }

    #[test]
    fn monotonic_series_has_no_peaks() {
        let closes: Vec<f64> = (0..110).map(|i| 10.0 + 0.1 * i as f64).collect();
        let eval = PeakKdjSelector::new(PeakKdjConfig::default())
            .unwrap()
            .evaluate(&tight_bars(&closes))
            .unwrap();
        assert!(!eval.passed);
        assert_eq!(eval.gates.len(), 1);
        assert_eq!(eval.gates[0].gate, Gate::Peaks);
        assert_eq!(eval.gates[0].value, 0.0);
    }

    #[test]
    fn empty_history_fails_without_error() {
        let eval = PeakKdjSelector::new(PeakKdjConfig::default())
            .unwrap()
            .evaluate(&[])
            .unwrap();
        assert!(!eval.passed);
    }

    #[test]
    fn invalid_configs_rejected() {
        assert!(PeakKdjSelector::new(PeakKdjConfig {
            fluc_threshold: -0.1,
            ..PeakKdjConfig::default()
        })
        .is_err());
        assert!(PeakKdjSelector::new(PeakKdjConfig {
            max_window: 0,
            ..PeakKdjConfig::default()
        })
        .is_err());
    }
}
