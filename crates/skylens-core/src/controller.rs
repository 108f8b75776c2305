#![forbid(unsafe_code)]

//! Proportional temperature controller.
//!
//! Each step measures how many of the heaviest points are needed to reach
//! `target_mass` of the total weight (the *head*), compares the head's share
//! of the point count with a fixed reference of 20%, and nudges the softmax
//! temperature against the error:
//!
//! ```text
//! tau <- clamp(tau - (head_fraction - 0.20) * GAIN * dt, 0.05, 1.5)
//! ```
//!
//! A wide head (too many points needed) lowers the temperature, which
//! sharpens the weights; a narrow head raises it. There is no integral or
//! derivative term, and the error signal is piecewise constant, so a small
//! residual oscillation around the reference is expected.

use serde::Serialize;

use crate::sampler::{Field, MIN_TEMPERATURE};

/// Head fraction the controller steers toward.
pub const REFERENCE_HEAD_FRACTION: f64 = 0.20;
/// Proportional gain.
pub const GAIN: f64 = 1.0;
pub const MAX_TEMPERATURE: f64 = 1.5;

/// Head-of-distribution statistics for one weight array.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HeadStats {
    /// Smallest prefix (heaviest first) whose weight reaches the target.
    pub k: usize,
    /// `k / n`.
    pub head_fraction: f64,
    /// Cumulative weight of that prefix.
    pub mass: f64,
}

/// Compute [`HeadStats`] for `weights` and `target_mass`.
///
/// If the target cannot be reached (rounding, or a target above 1) `k` is
/// the full length. An empty array yields all zeros.
#[must_use]
pub fn head_stats(weights: &[f64], target_mass: f64) -> HeadStats {
    if weights.is_empty() {
        return HeadStats::default();
    }
    let mut sorted = weights.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut mass = 0.0;
    let mut k = sorted.len();
    for (i, w) in sorted.iter().enumerate() {
        mass += w;
        if mass >= target_mass {
            k = i + 1;
            break;
        }
    }
    HeadStats {
        k,
        head_fraction: k as f64 / sorted.len() as f64,
        mass,
    }
}

/// Controller state: the temperature it owns and its switch.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightController {
    temperature: f64,
    pub enabled: bool,
    pub target_mass: f64,
}

impl WeightController {
    #[must_use]
    pub fn new(temperature: f64, target_mass: f64, enabled: bool) -> Self {
        Self {
            temperature: clamp_temperature(temperature),
            enabled,
            target_mass,
        }
    }

    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Set the temperature directly (manual slider), clamped.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = clamp_temperature(temperature);
    }

    /// One control step of length `dt` seconds.
    ///
    /// Returns the head statistics measured before the update, or `None` if
    /// the controller is disabled or the field is empty (temperature and
    /// weights untouched).
    pub fn step(&mut self, field: &mut Field, dt: f64) -> Option<HeadStats> {
        if !self.enabled || field.is_empty() {
            return None;
        }
        let stats = head_stats(field.weights(), self.target_mass);
        let error = stats.head_fraction - REFERENCE_HEAD_FRACTION;
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.temperature = clamp_temperature(self.temperature - error * GAIN * dt);
        field.reweight(self.temperature);

        tracing::trace!(
            target: "skylens.controller",
            head_fraction = stats.head_fraction,
            k = stats.k,
            error,
            temperature = self.temperature,
            "controller step"
        );
        Some(stats)
    }
}

fn clamp_temperature(t: f64) -> f64 {
    if t.is_finite() {
        t.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
    } else {
        0.55_f64.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoCoord;
    use crate::sampler::{Dimension, Mood, SamplePoint};

    fn field(saliences: &[f64], temperature: f64) -> Field {
        let points = saliences
            .iter()
            .map(|&salience| SamplePoint {
                position: GeoCoord::default(),
                salience,
                dimension: Dimension::Race,
                mood: Mood::Positive,
            })
            .collect();
        Field::from_samples(points, temperature, 0)
    }

    #[test]
    fn head_stats_counts_prefix() {
        let s = head_stats(&[0.1, 0.5, 0.4], 0.8);
        assert_eq!(s.k, 2);
        assert!((s.mass - 0.9).abs() < 1e-12);
        assert!((s.head_fraction - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn unreachable_target_takes_everything() {
        let s = head_stats(&[0.25, 0.25], 1.5);
        assert_eq!(s.k, 2);
        assert_eq!(s.head_fraction, 1.0);
    }

    #[test]
    fn empty_weights_give_zero_stats() {
        assert_eq!(head_stats(&[], 0.8), HeadStats::default());
    }

    #[test]
    fn wide_head_cools_the_field() {
        // Near-uniform saliences: the head needs ~80% of the points.
        let mut f = field(&[1.0, 0.99, 0.98, 0.97, 0.96], 0.55);
        let mut c = WeightController::new(0.55, 0.8, true);
        c.step(&mut f, 0.1);
        assert!(c.temperature() < 0.55);
        assert_eq!(f.temperature(), c.temperature());
    }

    #[test]
    fn disabled_controller_is_inert() {
        let mut f = field(&[1.0, 0.5], 0.55);
        let before = f.clone();
        let mut c = WeightController::new(0.55, 0.8, false);
        assert!(c.step(&mut f, 1.0).is_none());
        assert_eq!(c.temperature(), 0.55);
        assert_eq!(f, before);
    }

    #[test]
    fn empty_field_is_skipped() {
        let mut f = Field::empty();
        let mut c = WeightController::new(0.55, 0.8, true);
        assert!(c.step(&mut f, 1.0).is_none());
        assert_eq!(c.temperature(), 0.55);
    }

    #[test]
    fn temperature_stays_clamped() {
        let mut f = field(&[1.0, 1.0, 1.0, 1.0], 0.55);
        let mut c = WeightController::new(0.55, 0.95, true);
        for _ in 0..1000 {
            c.step(&mut f, 0.1);
        }
        assert_eq!(c.temperature(), MIN_TEMPERATURE);
        c.set_temperature(f64::INFINITY);
        assert_eq!(c.temperature(), 0.55);
        c.set_temperature(9.0);
        assert_eq!(c.temperature(), MAX_TEMPERATURE);
    }
}
