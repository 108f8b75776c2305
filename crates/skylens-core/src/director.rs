#![forbid(unsafe_code)]

//! Auto-Director: steer the sky lens toward the weighted centre of the field.
//!
//! The target is the normalized centroid of horizontal unit vectors, so it is
//! well defined across the azimuth wrap (averaging 350° and 10° gives 0°,
//! not 180°). Candidates are the locked points, each with a fixed bonus on
//! top of its weight, or the heaviest points when nothing is locked. Points
//! below the horizon never contribute.
//!
//! # Invariants
//!
//! 1. A target, when present, comes from a unit vector and has
//!    `alt ∈ [0, 90]`, `az ∈ [0, 360)`.
//! 2. Steering never moves the lens outside `alt ∈ [0, 90]`,
//!    `az ∈ [0, 360)`.
//! 3. While the user interacts, or within the cooldown after a lens drag,
//!    steering is suspended and only the cooldown runs down.

use serde::Serialize;

use crate::geo::{GeoCoord, HorizontalCoord, geographic_to_horizontal, shortest_angle_delta, wrap_azimuth};
use crate::lens::Lens;
use crate::sampler::Field;

/// Extra weight given to each locked point.
pub const LOCK_BONUS: f64 = 0.6;
/// Seconds of suspended steering after a manual lens drag.
pub const COOLDOWN_SECS: f64 = 0.25;
/// Minimum number of heaviest points considered when nothing is locked.
pub const MIN_CANDIDATES: usize = 20;
/// Share of the field considered when nothing is locked.
pub const CANDIDATE_FRACTION: f64 = 0.05;
pub const DEFAULT_SPEED: f64 = 0.15;

/// A computed steering target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectorTarget {
    pub direction: HorizontalCoord,
    /// Unit vector (east, north, zenith) the direction was derived from.
    pub vector: [f64; 3],
}

/// Weighted spherical mean of the candidate points as seen by `observer`.
///
/// `None` when no candidate is above the horizon with positive weight.
#[must_use]
pub fn estimate_target(field: &Field, observer: GeoCoord) -> Option<DirectorTarget> {
    let weights = field.weights();
    let candidates: Vec<(usize, f64)> = if field.locks().is_empty() {
        let n = ((field.len() as f64 * CANDIDATE_FRACTION).floor() as usize).max(MIN_CANDIDATES);
        field.top_by_weight(n).into_iter().map(|i| (i, 0.0)).collect()
    } else {
        field.locks().iter().map(|&i| (i, LOCK_BONUS)).collect()
    };

    let mut acc = [0.0_f64; 3];
    let mut total = 0.0;
    for (i, bonus) in candidates {
        let h = geographic_to_horizontal(field.points()[i].position, observer);
        let w = weights[i] + bonus;
        if h.alt < 0.0 || w <= 0.0 {
            continue;
        }
        let v = h.unit_vector();
        for (a, c) in acc.iter_mut().zip(v) {
            *a += c * w;
        }
        total += w;
    }
    if total <= 0.0 {
        return None;
    }

    let norm = (acc[0] * acc[0] + acc[1] * acc[1] + acc[2] * acc[2]).sqrt();
    if !(norm.is_finite() && norm > f64::EPSILON) {
        return None;
    }
    let vector = [acc[0] / norm, acc[1] / norm, acc[2] / norm];
    let raw = HorizontalCoord::from_vector(vector);
    Some(DirectorTarget {
        direction: HorizontalCoord::new(raw.az, raw.alt.clamp(0.0, 90.0)),
        vector,
    })
}

/// Steering state.
#[derive(Debug, Clone, PartialEq)]
pub struct Director {
    pub enabled: bool,
    speed: f64,
    target: Option<DirectorTarget>,
    cooldown: f64,
}

impl Default for Director {
    fn default() -> Self {
        Self {
            enabled: false,
            speed: DEFAULT_SPEED,
            target: None,
            cooldown: 0.0,
        }
    }
}

impl Director {
    /// A director with no target yet; `speed` is clamped like [`Director::set_speed`].
    #[must_use]
    pub fn new(enabled: bool, speed: f64) -> Self {
        let mut director = Self {
            enabled,
            ..Self::default()
        };
        director.set_speed(speed);
        director
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Fraction of the remaining distance covered per step, clamped to
    /// `[0, 1]`.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() {
            self.speed = speed.clamp(0.0, 1.0);
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<DirectorTarget> {
        self.target
    }

    #[must_use]
    pub fn cooldown(&self) -> f64 {
        self.cooldown
    }

    /// Recompute the target from the current field.
    pub fn retarget(&mut self, field: &Field, observer: GeoCoord) -> Option<DirectorTarget> {
        let next = estimate_target(field, observer);
        if next.is_some() != self.target.is_some() {
            tracing::debug!(
                target: "skylens.director",
                defined = next.is_some(),
                az = next.map(|t| t.direction.az),
                alt = next.map(|t| t.direction.alt),
                "director target changed"
            );
        }
        self.target = next;
        next
    }

    /// Drop the target (used when leaving the horizontal frame).
    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// Suspend steering for [`COOLDOWN_SECS`].
    pub fn begin_cooldown(&mut self) {
        self.cooldown = COOLDOWN_SECS;
    }

    /// Advance one tick. Returns `true` if the lens moved.
    pub fn step(&mut self, lens: &mut Lens, dt: f64, interacting: bool) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        if !self.enabled {
            return false;
        }
        if interacting || self.cooldown > 0.0 {
            let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
            self.cooldown = (self.cooldown - dt).max(0.0);
            return false;
        }
        let t = target.direction;
        let d_az = shortest_angle_delta(lens.sky.az, t.az);
        lens.sky.az = wrap_azimuth(lens.sky.az + d_az * self.speed);
        lens.sky.alt = (lens.sky.alt + (t.alt - lens.sky.alt) * self.speed).clamp(0.0, 90.0);
        true
    }
}
