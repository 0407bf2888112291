//! Small numeric helpers shared by indicators and selectors.

/// Linear-interpolated quantile of the finite values in `values`.
///
/// Position is `q * (n - 1)` over the sorted values, interpolating between
/// neighbours. Returns `None` when no finite value exists or `q` is outside [0, 1].
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Rolling minimum with a one-observation minimum: index `t` covers
/// `values[t+1-window..=t]`, truncated at the start. NaNs are skipped; a
/// window with no finite value yields NaN.
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_fold(values, window, f64::min)
}

/// Rolling maximum, same windowing as [`rolling_min`].
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_fold(values, window, f64::max)
}

fn rolling_fold(values: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|t| {
            let start = (t + 1).saturating_sub(window);
            values[start..=t]
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .reduce(pick)
                .unwrap_or(f64::NAN)
        })
        .collect()
}

/// Finite minimum and maximum of a slice, `None` if no finite value exists.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
