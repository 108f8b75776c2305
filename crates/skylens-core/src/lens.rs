#![forbid(unsafe_code)]

//! The angular query lens and its O(N) scorer.
//!
//! A point inside the lens radius scores `weight / max(0.5, Q) * kernel(a)`
//! where `a` is its angular distance from the focus in the active frame.
//! Scores are then divided by their maximum, so the best in-radius point
//! reads 1. The aggregate intensity `1 - exp(-sum / 20)` uses the raw sum.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::frame::FrameView;
use crate::gauge::squash;
use crate::geo::{GeoCoord, HorizontalCoord};
use crate::sampler::Field;

/// Default lens radius in degrees.
pub const DEFAULT_RADIUS_DEG: f64 = 20.0;
/// Radius bounds accepted by [`Lens::set_radius`].
pub const MIN_RADIUS_DEG: f64 = 1.0;
pub const MAX_RADIUS_DEG: f64 = 90.0;

const INTENSITY_SCALE: f64 = 20.0;
const MIN_QUALITY_DIVISOR: f64 = 0.5;

/// Angular falloff used inside the lens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LensKernel {
    /// Bounded Gaussian-like falloff, `exp(-a^2 / 25)`.
    #[default]
    Concentrated,
    /// Unbounded inverse falloff, `1 / (a + 0.01)`.
    LongTailed,
}

impl LensKernel {
    #[must_use]
    pub fn eval(self, angle_deg: f64) -> f64 {
        match self {
            Self::Concentrated => (-(angle_deg * angle_deg) / 25.0).exp(),
            Self::LongTailed => 1.0 / (angle_deg + 0.01),
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Concentrated => Self::LongTailed,
            Self::LongTailed => Self::Concentrated,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concentrated => "concentrated",
            Self::LongTailed => "long-tailed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "long-tailed" | "long_tailed" | "longtailed" => Self::LongTailed,
            _ => Self::Concentrated,
        }
    }
}

impl Serialize for LensKernel {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LensKernel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Self::parse(&raw))
    }
}

/// Lens state. Both focus coordinates are kept; the active frame decides
/// which one is live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lens {
    pub geo: GeoCoord,
    pub sky: HorizontalCoord,
    pub radius_deg: f64,
    pub kernel: LensKernel,
    pub dragging: bool,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            geo: GeoCoord::new(0.0, 0.0),
            sky: HorizontalCoord::new(0.0, 60.0),
            radius_deg: DEFAULT_RADIUS_DEG,
            kernel: LensKernel::Concentrated,
            dragging: false,
        }
    }
}

impl Lens {
    /// Set the radius, clamped to `[1, 90]`; non-finite input is ignored.
    pub fn set_radius(&mut self, radius_deg: f64) {
        if radius_deg.is_finite() {
            self.radius_deg = radius_deg.clamp(MIN_RADIUS_DEG, MAX_RADIUS_DEG);
        }
    }
}

/// Per-point scores and the aggregate intensity.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LensReading {
    /// One score per point, max-normalized into `[0, 1]`.
    pub scores: Vec<f64>,
    /// `1 - exp(-raw_sum / 20)`, in `[0, 1)`.
    pub intensity: f64,
}

/// Score every point of `field` against `lens`.
#[must_use]
pub fn score(field: &Field, view: &FrameView<'_>, lens: &Lens, quality_q: f64) -> LensReading {
    let divisor = quality_q.max(MIN_QUALITY_DIVISOR);
    let mut sum = 0.0;
    let mut max = 0.0_f64;
    let mut scores: Vec<f64> = field
        .points()
        .iter()
        .zip(field.weights())
        .map(|(p, &w)| match view.lens_separation(lens, p.position) {
            Some(a) if a <= lens.radius_deg => {
                let s = w / divisor * lens.kernel.eval(a);
                sum += s;
                max = max.max(s);
                s
            }
            _ => 0.0,
        })
        .collect();

    if max > 0.0 {
        for s in &mut scores {
            *s /= max;
        }
    }
    LensReading {
        scores,
        intensity: squash(sum, INTENSITY_SCALE),
    }
}

/// Mean of the positive normalized scores; 0 when nothing is in the lens.
#[must_use]
pub fn lens_metric(scores: &[f64]) -> f64 {
    let (sum, n) = scores
        .iter()
        .filter(|&&s| s > 0.0)
        .fold((0.0, 0usize), |(sum, n), &s| (sum + s, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}
