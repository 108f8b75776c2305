#![forbid(unsafe_code)]

//! Heavy-tailed point-field generation and the salience/weight model.
//!
//! [`generate`] scatters `art_points` samples around a focus direction with
//! Student-t offsets, scores each one for proximity, intent alignment and
//! mood, and packs the result into a [`Field`].
//!
//! # Invariants
//!
//! 1. After generation the largest salience is exactly 1 (or the field is
//!    empty).
//! 2. Weights are finite, non-negative and sum to 1 for every temperature.
//! 3. Points, weights and locks live in one [`Field`] value. Regeneration
//!    replaces all three in a single assignment, so a lock index can never
//!    outlive the point it referred to.
//! 4. Generation is a pure function of `(focus, config, seed, moods)`.
//!
//! # Failure Modes
//!
//! - A Student-t draw whose chi-square denominator is zero is clamped to a
//!   large finite offset rather than producing an infinite coordinate.
//! - Mood gains are floored at a small positive value so a strongly
//!   negative mood cannot zero every salience.

use std::collections::BTreeSet;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::config::{FieldConfig, IntentAxis};
use crate::geo::{GeoCoord, great_circle_deg, wrap_longitude};

/// Longitude spread of the scatter (degrees per unit Student-t).
pub const LON_SPREAD_DEG: f64 = 40.0;
/// Latitude spread of the scatter.
pub const LAT_SPREAD_DEG: f64 = 25.0;
/// Great-circle distance at which radial alignment reaches zero.
pub const RADIAL_ALIGNMENT_DEG: f64 = 60.0;
/// Angular scale of the `1 / (1 + (d / s)^2)` proximity falloff.
pub const FALLOFF_SCALE_DEG: f64 = 45.0;
/// Generated latitudes stay strictly inside the poles.
pub const MAX_ABS_LAT: f64 = 89.9;
/// Lowest temperature used as a softmax divisor.
pub const MIN_TEMPERATURE: f64 = 0.05;

/// Mood gains at or below zero are replaced by this so saliences stay positive.
const MOOD_GAIN_FLOOR: f64 = 1e-9;
const MAX_STUDENT_T: f64 = 1.0e6;

/// Category each sample is assigned to, round-robin in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Creed,
    Race,
    Class,
    Caste,
    Tribe,
    Nationality,
    Continentality,
    Planetarity,
    Occupation,
}

impl Dimension {
    pub const ALL: [Self; 9] = [
        Self::Creed,
        Self::Race,
        Self::Class,
        Self::Caste,
        Self::Tribe,
        Self::Nationality,
        Self::Continentality,
        Self::Planetarity,
        Self::Occupation,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creed => "creed",
            Self::Race => "race",
            Self::Class => "class",
            Self::Caste => "caste",
            Self::Tribe => "tribe",
            Self::Nationality => "nationality",
            Self::Continentality => "continentality",
            Self::Planetarity => "planetarity",
            Self::Occupation => "occupation",
        }
    }

    /// Case-insensitive lookup by name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(raw))
    }
}

/// Signed outlook attached to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Positive,
    Negative,
}

impl Mood {
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }

    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }
}

/// Per-category mood, all positive by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoodMap {
    moods: [Mood; 9],
}

impl MoodMap {
    #[must_use]
    pub fn get(&self, dimension: Dimension) -> Mood {
        self.moods[dimension.index()]
    }

    pub fn set(&mut self, dimension: Dimension, mood: Mood) {
        self.moods[dimension.index()] = mood;
    }

    /// Flip one category and return its new mood.
    pub fn toggle(&mut self, dimension: Dimension) -> Mood {
        let next = self.get(dimension).flipped();
        self.set(dimension, next);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, Mood)> + '_ {
        Dimension::ALL.into_iter().map(|d| (d, self.get(d)))
    }
}

/// One generated sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub position: GeoCoord,
    /// Normalized salience in `[0, 1]`.
    pub salience: f64,
    pub dimension: Dimension,
    pub mood: Mood,
}

/// The working point set with its weights and lock set.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    points: Vec<SamplePoint>,
    weights: Vec<f64>,
    locks: BTreeSet<usize>,
    temperature: f64,
    epoch: u64,
}

impl Default for Field {
    fn default() -> Self {
        Self::empty()
    }
}

impl Field {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            points: Vec::new(),
            weights: Vec::new(),
            locks: BTreeSet::new(),
            temperature: MIN_TEMPERATURE,
            epoch: 0,
        }
    }

    /// Build a field from raw samples: saliences are sanitized and
    /// normalized by their maximum, weights are computed at `temperature`,
    /// and the lock set starts empty.
    #[must_use]
    pub fn from_samples(mut points: Vec<SamplePoint>, temperature: f64, epoch: u64) -> Self {
        let max = points
            .iter_mut()
            .map(|p| {
                if !p.salience.is_finite() || p.salience < 0.0 {
                    p.salience = 0.0;
                }
                p.salience
            })
            .fold(0.0_f64, f64::max);
        if max > 0.0 {
            for p in &mut points {
                p.salience /= max;
            }
        }
        let saliences: Vec<f64> = points.iter().map(|p| p.salience).collect();
        let weights = softmax_weights(&saliences, temperature);
        Self {
            points,
            weights,
            locks: BTreeSet::new(),
            temperature: effective_temperature(temperature),
            epoch,
        }
    }

    #[must_use]
    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Generation counter; bumps on every regeneration.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Temperature the current weights were computed at (already floored).
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    #[must_use]
    pub fn locks(&self) -> &BTreeSet<usize> {
        &self.locks
    }

    #[must_use]
    pub fn is_locked(&self, index: usize) -> bool {
        self.locks.contains(&index)
    }

    /// Recompute weights from the unchanged saliences.
    pub fn reweight(&mut self, temperature: f64) {
        let saliences: Vec<f64> = self.points.iter().map(|p| p.salience).collect();
        self.weights = softmax_weights(&saliences, temperature);
        self.temperature = effective_temperature(temperature);
    }

    /// Flip the lock on `index`. Returns the new state; indices outside
    /// the field are ignored and report `false`.
    pub fn toggle_lock(&mut self, index: usize) -> bool {
        if index >= self.points.len() {
            return false;
        }
        if self.locks.remove(&index) {
            false
        } else {
            self.locks.insert(index);
            true
        }
    }

    pub fn clear_locks(&mut self) {
        self.locks.clear();
    }

    /// Replace the lock set with the `k` highest-salience indices.
    pub fn lock_top(&mut self, k: usize) {
        self.locks = self.top_by_salience(k).into_iter().collect();
    }

    /// Indices of the `n` highest-salience points, ties by index.
    #[must_use]
    pub fn top_by_salience(&self, n: usize) -> Vec<usize> {
        top_indices(self.points.len(), n, |i| self.points[i].salience)
    }

    /// Indices of the `n` heaviest points, ties by index.
    #[must_use]
    pub fn top_by_weight(&self, n: usize) -> Vec<usize> {
        top_indices(self.weights.len(), n, |i| self.weights[i])
    }

    /// `(positive, negative)` mood counts.
    #[must_use]
    pub fn mood_counts(&self) -> (usize, usize) {
        let pos = self
            .points
            .iter()
            .filter(|p| p.mood == Mood::Positive)
            .count();
        (pos, self.points.len() - pos)
    }
}

fn top_indices(len: usize, n: usize, key: impl Fn(usize) -> f64) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..len).collect();
    idx.sort_by(|&a, &b| key(b).total_cmp(&key(a)).then(a.cmp(&b)));
    idx.truncate(n);
    idx
}

fn effective_temperature(temperature: f64) -> f64 {
    // f64::max ignores NaN, so a NaN temperature lands on the floor.
    temperature.max(MIN_TEMPERATURE)
}

/// Numerically stable softmax of `salience / max(0.05, temperature)`.
#[must_use]
pub fn softmax_weights(salience: &[f64], temperature: f64) -> Vec<f64> {
    if salience.is_empty() {
        return Vec::new();
    }
    let t = effective_temperature(temperature);
    let max = salience.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = salience.iter().map(|&s| ((s - max) / t).exp()).collect();
    // The maximum contributes exp(0) = 1, so the sum is at least 1.
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Fixed linear-congruential step applied on every reseed.
#[must_use]
pub fn next_seed(seed: u32) -> u32 {
    seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223)
}

/// Box-Muller standard normal.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u = 1.0 - rng.random::<f64>();
    let v = rng.random::<f64>();
    (-2.0 * u.ln()).sqrt() * (std::f64::consts::TAU * v).cos()
}

fn chi_square<R: Rng>(nu: u32, rng: &mut R) -> f64 {
    (0..nu)
        .map(|_| {
            let z = standard_normal(rng);
            z * z
        })
        .sum()
}

/// Student-t variate with `nu` degrees of freedom, clamped to a finite range.
pub fn student_t<R: Rng>(nu: u32, rng: &mut R) -> f64 {
    let nu = nu.max(1);
    let z = standard_normal(rng);
    let t = z / (chi_square(nu, rng) / f64::from(nu)).sqrt();
    if t.is_nan() {
        0.0
    } else {
        t.clamp(-MAX_STUDENT_T, MAX_STUDENT_T)
    }
}

fn alignment(axis: IntentAxis, dlon: f64, dlat: f64, distance: f64) -> f64 {
    match axis {
        IntentAxis::Lon => 1.0 - (dlon.abs() / LON_SPREAD_DEG).min(1.0),
        IntentAxis::Lat => 1.0 - (dlat.abs() / LAT_SPREAD_DEG).min(1.0),
        IntentAxis::Radial => (1.0 - distance / RADIAL_ALIGNMENT_DEG).max(0.0),
    }
}

/// Generate a fresh field around `focus`.
///
/// Locks are seeded with the `lock_top_k` highest-salience points; the
/// weights use `temperature` (the controller's current value, which starts
/// at `config.pareto_tau`).
#[must_use]
pub fn generate(
    focus: GeoCoord,
    config: &FieldConfig,
    temperature: f64,
    seed: u32,
    moods: &MoodMap,
    epoch: u64,
) -> Field {
    let mut rng = SmallRng::seed_from_u64(u64::from(seed));
    let points = (0..config.art_points)
        .map(|i| {
            let dimension = Dimension::ALL[i % Dimension::ALL.len()];
            let dlon = student_t(config.art_nu, &mut rng) * LON_SPREAD_DEG;
            let dlat = student_t(config.art_nu, &mut rng) * LAT_SPREAD_DEG;
            let position = GeoCoord::new(
                wrap_longitude(focus.lon + dlon),
                (focus.lat + dlat).clamp(-MAX_ABS_LAT, MAX_ABS_LAT),
            );

            let distance = great_circle_deg(focus, position);
            let falloff = 1.0 / (1.0 + (distance / FALLOFF_SCALE_DEG).powi(2));
            let align = alignment(config.intent_axis, dlon, dlat, distance);
            let mood = moods.get(dimension);
            let mood_gain =
                (1.0 + config.mood_strength * mood.sign() * 0.25).max(MOOD_GAIN_FLOOR);

            SamplePoint {
                position,
                salience: falloff * (1.0 + config.intent_strength * align) * mood_gain,
                dimension,
                mood,
            }
        })
        .collect();

    let mut field = Field::from_samples(points, temperature, epoch);
    field.lock_top(config.lock_top_k);

    let (positive, negative) = field.mood_counts();
    tracing::debug!(
        target: "skylens.sampler",
        seed,
        epoch,
        points = field.len(),
        locked = field.locks().len(),
        positive,
        negative,
        "field regenerated"
    );
    field
}
