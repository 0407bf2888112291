//! Peak extraction on a 1-D series.
//!
//! Follows the classic `find_peaks` pipeline: local maxima (flat tops resolve
//! to their midpoint), then the optional filters in a fixed order:
//! height, distance, prominence, width. Prominence is measured over the
//! unbounded window; width is measured at `rel_height` of the prominence with
//! linearly interpolated intersection points.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::frame::IndicatorFrame;

/// Filter settings. `None` disables a filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakParams {
    /// Minimum peak value.
    pub height: Option<f64>,
    /// Minimum horizontal distance in samples between kept peaks.
    pub distance: Option<usize>,
    /// Minimum prominence.
    pub prominence: Option<f64>,
    /// Minimum width at `rel_height`.
    pub width: Option<f64>,
    pub rel_height: f64,
}

impl Default for PeakParams {
    fn default() -> Self {
        Self {
            height: None,
            distance: None,
            prominence: None,
            width: None,
            rel_height: 0.5,
        }
    }
}

/// One detected peak. Optional properties are filled when the matching filter
/// (or a filter that depends on it) was requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Peak {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub value: f64,
    pub peak_height: Option<f64>,
    pub prominence: Option<f64>,
    pub left_base: Option<usize>,
    pub right_base: Option<usize>,
    pub width: Option<f64>,
    pub width_height: Option<f64>,
    pub left_ip: Option<f64>,
    pub right_ip: Option<f64>,
}

impl Peak {
    fn at(index: usize, value: f64) -> Self {
        Self {
            index,
            date: None,
            value,
            peak_height: None,
            prominence: None,
            left_base: None,
            right_base: None,
            width: None,
            width_height: None,
            left_ip: None,
            right_ip: None,
        }
    }
}

/// Detect peaks in `x`, ascending by index.
pub fn find_peaks(x: &[f64], params: &PeakParams) -> Vec<Peak> {
    let mut peaks: Vec<Peak> = local_maxima(x)
        .into_iter()
        .map(|i| Peak::at(i, x[i]))
        .collect();

    if let Some(hmin) = params.height {
        peaks.retain(|p| hmin <= p.value);
        for p in &mut peaks {
            p.peak_height = Some(p.value);
        }
    }

    if let Some(distance) = params.distance {
        peaks = select_by_distance(peaks, distance.max(1));
    }

    if params.prominence.is_some() || params.width.is_some() {
        for p in &mut peaks {
            let (prom, left, right) = prominence(x, p.index);
            p.prominence = Some(prom);
            p.left_base = Some(left);
            p.right_base = Some(right);
        }
    }

    if let Some(pmin) = params.prominence {
        peaks.retain(|p| p.prominence.is_some_and(|v| pmin <= v));
    }

    if let Some(wmin) = params.width {
        for p in &mut peaks {
            measure_width(x, p, params.rel_height);
        }
        peaks.retain(|p| p.width.is_some_and(|w| wmin <= w));
    }

    peaks
}

/// Run [`find_peaks`] on a frame column and attach bar dates.
pub fn find_peaks_in(
    frame: &IndicatorFrame<'_>,
    column: &str,
    params: &PeakParams,
) -> Result<Vec<Peak>, FrameError> {
    let values = frame.column(column)?;
    let mut peaks = find_peaks(values, params);
    for p in &mut peaks {
        p.date = frame.date(p.index);
    }
    Ok(peaks)
}

// ─── Pipeline stages ─────────────────────────────────────────────────

/// Indices of strict local maxima; a flat top counts once at its midpoint
/// (rounded down). Samples at either border are never maxima.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut out = Vec::new();
    if x.len() < 3 {
        return out;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                out.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    out
}

/// Keep higher peaks first, dropping any neighbour closer than `distance`.
/// Equal heights favour the later peak.
fn select_by_distance(peaks: Vec<Peak>, distance: usize) -> Vec<Peak> {
    let n = peaks.len();
    let mut keep = vec![true; n];

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| peaks[a].value.total_cmp(&peaks[b].value));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j].index - peaks[k - 1].index < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < n && peaks[k].index - peaks[j].index < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

/// Prominence with left and right bases, searching the whole series.
fn prominence(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let top = x[peak];

    let mut left_min = top;
    let mut left_base = peak;
    let mut i = peak as isize;
    while i >= 0 && x[i as usize] <= top {
        if x[i as usize] < left_min {
            left_min = x[i as usize];
            left_base = i as usize;
        }
        i -= 1;
    }

    let mut right_min = top;
    let mut right_base = peak;
    let mut i = peak;
    while i < x.len() && x[i] <= top {
        if x[i] < right_min {
            right_min = x[i];
            right_base = i;
        }
        i += 1;
    }

    (top - left_min.max(right_min), left_base, right_base)
}

fn measure_width(x: &[f64], p: &mut Peak, rel_height: f64) {
    let (Some(prom), Some(i_min), Some(i_max)) = (p.prominence, p.left_base, p.right_base) else {
        return;
    };
    let height = x[p.index] - prom * rel_height;

    let mut i = p.index;
    while i_min < i && height < x[i] {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if x[i] < height {
        left_ip += (height - x[i]) / (x[i + 1] - x[i]);
    }

    let mut i = p.index;
    while i < i_max && height < x[i] {
        i += 1;
    }
    let mut right_ip = i as f64;
    if x[i] < height {
        right_ip -= (height - x[i]) / (x[i - 1] - x[i]);
    }

    p.width_height = Some(height);
    p.left_ip = Some(left_ip);
    p.right_ip = Some(right_ip);
    p.width = Some(right_ip - left_ip);
}
