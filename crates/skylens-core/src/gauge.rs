#![forbid(unsafe_code)]

//! Pairwise kernel gauges.
//!
//! For every visible active point `i` and every visible point `j` (self
//! pairs included) two sums accumulate `(w_i / Q) * (w_j / Q) * K(i, j)`:
//!
//! - `g`: Gaussian kernel on squared pixel distance, `exp(-d^2 / 3000)`;
//! - `v`: inverse distance, `1 / (d + 0.001)`.
//!
//! Each sum is squashed with `1 - exp(-s / 50)` into `[0, 1)`. Points are
//! projected once per call, so the cost is `O(N + |active| * N)`.

use serde::Serialize;

use crate::frame::FrameView;
use crate::geo::ScreenPoint;
use crate::sampler::Field;

/// Minimum size of the fallback active set.
pub const MIN_ACTIVE: usize = 3;
/// Share of the field used as the fallback active set.
pub const ACTIVE_FRACTION: f64 = 0.05;

const GAUSSIAN_WIDTH_PX2: f64 = 3000.0;
const INVERSE_OFFSET_PX: f64 = 1.0e-3;
const SQUASH_SCALE: f64 = 50.0;

/// The two bounded interaction scalars.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Gauges {
    pub g: f64,
    pub v: f64,
}

/// `1 - exp(-value / scale)`, kept strictly below 1.
#[must_use]
pub fn squash(value: f64, scale: f64) -> f64 {
    if value.is_nan() || value <= 0.0 {
        return 0.0;
    }
    (1.0 - (-value / scale).exp()).min(1.0 - f64::EPSILON)
}

/// The active set: the locks, or the top 5% by salience (at least three).
#[must_use]
pub fn active_indices(field: &Field) -> Vec<usize> {
    if !field.locks().is_empty() {
        return field.locks().iter().copied().collect();
    }
    let n = ((field.len() as f64 * ACTIVE_FRACTION).floor() as usize).max(MIN_ACTIVE);
    field.top_by_salience(n)
}

/// Compute both gauges for the field as seen through `view`.
#[must_use]
pub fn compute(field: &Field, view: &FrameView<'_>, quality_q: f64) -> Gauges {
    if field.is_empty() {
        return Gauges::default();
    }
    let q = if quality_q.is_finite() && quality_q > 0.0 { quality_q } else { 1.0 };
    let weights = field.weights();

    let projected: Vec<Option<ScreenPoint>> = field
        .points()
        .iter()
        .map(|p| view.project(p.position))
        .collect();
    let visible: Vec<(ScreenPoint, f64)> = projected
        .iter()
        .zip(weights)
        .filter_map(|(s, &w)| s.map(|s| (s, w / q)))
        .collect();

    let mut sum_g = 0.0;
    let mut sum_v = 0.0;
    for i in active_indices(field) {
        let Some(pi) = projected[i] else { continue };
        let wi = weights[i] / q;
        for &(pj, wj) in &visible {
            let d2 = pi.distance_sq(pj);
            let pair = wi * wj;
            sum_g += pair * (-d2 / GAUSSIAN_WIDTH_PX2).exp();
            sum_v += pair / (d2.sqrt() + INVERSE_OFFSET_PX);
        }
    }
    Gauges {
        g: squash(sum_g, SQUASH_SCALE),
        v: squash(sum_v, SQUASH_SCALE),
    }
}
