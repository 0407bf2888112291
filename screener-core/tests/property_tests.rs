//! Property tests for indicator, trend and selector invariants.
//!
//! Uses proptest to verify:
//! 1. KDJ seeding and the J identity
//! 2. BBI uptrend detection on monotone series and under positive scaling
//! 3. Quantiles stay within the sample range
//! 4. Selectors never error or panic on arbitrary well-formed walks, and
//!    `explain` agrees with `select`

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::BTreeMap;

use screener_core::domain::Bar;
use screener_core::driver::SelectionDriver;
use screener_core::explain::NOT_SELECTED;
use screener_core::indicators::compute_kdj;
use screener_core::selectors::{
    BbiKdjConfig, BbiKdjSelector, BbiShortLongConfig, BbiShortLongSelector,
    BreakoutVolumeKdjConfig, BreakoutVolumeKdjSelector, PeakKdjConfig, PeakKdjSelector, Selector,
    SuperB1Config, SuperB1Selector,
};
use screener_core::stats::quantile;
use screener_core::trend::bbi_deriv_uptrend;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Close-to-close moves in percent, kept well away from zero prices.
fn arb_moves(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-6.0..6.0_f64, 1..max_len)
}

fn walk(moves: &[f64], volumes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut close = 20.0;
    moves
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let open = close;
            close = (close * (1.0 + m / 100.0)).max(1.0);
            Bar {
                symbol: "WALK".into(),
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: volumes[i % volumes.len()],
            }
        })
        .collect()
}

fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    (
        arb_moves(max_len),
        prop::collection::vec(100.0..10_000.0_f64, 1..20),
    )
        .prop_map(|(moves, volumes)| walk(&moves, &volumes))
}

/// Strictly increasing positive series with relative steps of at least ~1e-5.
fn arb_increasing() -> impl Strategy<Value = Vec<f64>> {
    (10.0..100.0_f64, prop::collection::vec(0.01..5.0_f64, 2..120)).prop_map(|(start, steps)| {
        let mut v = vec![start];
        for s in steps {
            let next = v[v.len() - 1] + s;
            v.push(next);
        }
        v
    })
}

fn all_selectors() -> Vec<Box<dyn Selector>> {
    vec![
        Box::new(BbiKdjSelector::new(BbiKdjConfig::default()).unwrap()),
        Box::new(
            SuperB1Selector::new(SuperB1Config {
                b1: Some(BbiKdjConfig::default()),
                ..SuperB1Config::default()
            })
            .unwrap(),
        ),
        Box::new(PeakKdjSelector::new(PeakKdjConfig::default()).unwrap()),
        Box::new(BbiShortLongSelector::new(BbiShortLongConfig::default()).unwrap()),
        Box::new(BreakoutVolumeKdjSelector::new(BreakoutVolumeKdjConfig::default()).unwrap()),
    ]
}

// ── 1. KDJ ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn kdj_seed_and_j_identity(bars in arb_bars(150)) {
        let kdj = compute_kdj(&bars, 9);
        prop_assert_eq!(kdj.k[0], 50.0);
        prop_assert_eq!(kdj.d[0], 50.0);
        for t in 0..bars.len() {
            prop_assert!((kdj.j[t] - (3.0 * kdj.k[t] - 2.0 * kdj.d[t])).abs() < 1e-9);
        }
    }
}

// ── 2. BBI uptrend ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn increasing_is_uptrend_for_every_window(series in arb_increasing()) {
        for min_window in 2..=series.len() {
            prop_assert!(bbi_deriv_uptrend(&series, min_window, None, 0.0).unwrap());
        }
    }

    #[test]
    fn decreasing_is_never_uptrend(series in arb_increasing(), q in 0.0..=1.0_f64) {
        let top = series[series.len() - 1];
        let falling: Vec<f64> = series.iter().map(|v| 2.0 * top - v).collect();
        for min_window in 2..=falling.len() {
            prop_assert!(!bbi_deriv_uptrend(&falling, min_window, None, q).unwrap());
        }
    }

    #[test]
    fn uptrend_is_scale_invariant(
        bars in arb_bars(150),
        min_window in 2usize..60,
        q in 0.0..=0.5_f64,
        exp in -3i32..=6,
    ) {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let scale = 2f64.powi(exp);
        let scaled: Vec<f64> = closes.iter().map(|c| c * scale).collect();
        prop_assert_eq!(
            bbi_deriv_uptrend(&closes, min_window, None, q).unwrap(),
            bbi_deriv_uptrend(&scaled, min_window, None, q).unwrap()
        );
    }
}

// ── 3. Quantile ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn quantile_within_range(values in prop::collection::vec(-1e6..1e6_f64, 1..200), q in 0.0..=1.0_f64) {
        let v = quantile(&values, q).unwrap();
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(lo - 1e-6 <= v && v <= hi + 1e-6);
        prop_assert_eq!(quantile(&values, 0.0).unwrap(), lo);
        prop_assert_eq!(quantile(&values, 1.0).unwrap(), hi);
    }
}

// ── 4. Selectors ─────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn selectors_evaluate_any_walk(bars in arb_bars(260)) {
        for sel in all_selectors() {
            let eval = sel.evaluate(&bars);
            prop_assert!(eval.is_ok(), "{} errored", sel.name());
            let eval = eval.unwrap();
            if eval.passed {
                prop_assert!(eval.gates.iter().all(|g| g.passed));
            } else {
                prop_assert!(eval.gates.last().map_or(true, |g| !g.passed));
            }
        }
    }

    #[test]
    fn explain_agrees_with_select(bars in arb_bars(260)) {
        let date = bars[bars.len() - 1].date;
        let mut data = BTreeMap::new();
        data.insert("WALK".to_string(), bars.clone());
        for sel in all_selectors() {
            let driver = SelectionDriver::new(sel).with_parallelism(false);
            let picked = !driver.select(date, &data).is_empty();
            let explanation = driver.explain("WALK", date, &bars).unwrap();
            prop_assert_eq!(picked, explanation.passed);
            if picked {
                prop_assert_ne!(explanation.to_string(), NOT_SELECTED);
            }
        }
    }
}
