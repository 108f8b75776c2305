#![forbid(unsafe_code)]

//! Field configuration as data.
//!
//! [`FieldConfig`] captures every tunable of the sampler, controller, lens
//! scoring and terrain. It can be loaded from TOML or JSON; every load path
//! runs the same sanitizer, so a `FieldConfig` value in hand is always
//! finite and in range.
//!
//! ```toml
//! pareto_tau = 0.55
//! target_mass = 0.80
//! auto_pareto = true
//! intent_axis = "radial"
//! art_points = 900
//! lock_top_k = 8
//! ```
//!
//! # Sanitizing
//!
//! Out-of-range values are clamped to the nearest bound; non-finite values
//! and values with no meaningful bound are replaced with the default. Each
//! replacement is reported once through `tracing` at `warn` level under the
//! `skylens.config` target.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, Result};
use crate::geo::GeoCoord;
use crate::terrain::{Planet, Terrain};

/// Upper bound on the Student-t degrees of freedom (each unit costs one
/// normal draw per variate).
pub const MAX_ART_NU: u32 = 1000;
pub const MIN_ART_POINTS: usize = 10;
pub const MAX_ART_POINTS: usize = 5000;
pub const MAX_TERRAIN_OCTAVES: u32 = 8;
/// Upper bound for `intent_strength` and `mood_strength`.
pub const MAX_STRENGTH: f64 = 1000.0;

/// Axis along which intent alignment is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntentAxis {
    /// Great-circle distance from the focus.
    #[default]
    Radial,
    /// Longitude offset only.
    Lon,
    /// Latitude offset only.
    Lat,
}

impl IntentAxis {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Radial => "radial",
            Self::Lon => "lon",
            Self::Lat => "lat",
        }
    }

    /// Unknown names fall back to [`IntentAxis::Radial`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lon" => Self::Lon,
            "lat" => Self::Lat,
            _ => Self::Radial,
        }
    }
}

impl Serialize for IntentAxis {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IntentAxis {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Self::parse(&raw))
    }
}

/// Whether discrete interaction events append a run record automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    #[default]
    Auto,
    Manual,
}

impl ExecMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual" => Self::Manual,
            _ => Self::Auto,
        }
    }
}

impl Serialize for ExecMode {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExecMode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Self::parse(&raw))
    }
}

/// Sanitized engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFieldConfig")]
pub struct FieldConfig {
    /// Softmax temperature; also the controller's starting point.
    pub pareto_tau: f64,
    /// Cumulative weight the head prefix must reach, in `[0.5, 0.95]`.
    pub target_mass: f64,
    /// Run the temperature controller every tick.
    pub auto_pareto: bool,
    /// Quality divisor for gauge and lens weights (> 0).
    pub quality_q: f64,
    pub intent_axis: IntentAxis,
    pub intent_strength: f64,
    /// Student-t degrees of freedom.
    pub art_nu: u32,
    pub art_points: usize,
    pub lock_top_k: usize,
    pub mood_strength: f64,
    pub terrain_amp: f64,
    pub terrain_octaves: u32,
    pub sun_lon: f64,
    pub sun_lat: f64,
    pub planet: Planet,
    pub exec_mode: ExecMode,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            pareto_tau: 0.55,
            target_mass: 0.80,
            auto_pareto: true,
            quality_q: 1.0,
            intent_axis: IntentAxis::Radial,
            intent_strength: 1.2,
            art_nu: 3,
            art_points: 900,
            lock_top_k: 8,
            mood_strength: 1.0,
            terrain_amp: 0.036,
            terrain_octaves: 4,
            sun_lon: 0.0,
            sun_lat: 20.0,
            planet: Planet::Earth,
            exec_mode: ExecMode::Auto,
        }
    }
}

impl FieldConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    /// Load a `.toml` or `.json` file, chosen by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml_file(path),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_file(path),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Re-run the sanitizer over a value built in code.
    #[must_use]
    pub fn sanitized(self) -> Self {
        RawFieldConfig::from(self).into()
    }

    /// List the fields the sanitizer would change, without changing them.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        RawFieldConfig::from(self.clone()).sanitize().1
    }

    /// Terrain model described by this config.
    #[must_use]
    pub fn terrain(&self) -> Terrain {
        Terrain {
            planet: self.planet,
            amplitude: self.terrain_amp,
            octaves: self.terrain_octaves,
            sun: GeoCoord::new(self.sun_lon, self.sun_lat),
        }
    }

    /// Serialize to TOML (used to print the default config).
    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Wire shape: every numeric field is read as `f64` so that negative,
/// fractional or non-finite input reaches the sanitizer instead of failing
/// deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawFieldConfig {
    pareto_tau: f64,
    target_mass: f64,
    auto_pareto: bool,
    quality_q: f64,
    intent_axis: IntentAxis,
    intent_strength: f64,
    art_nu: f64,
    art_points: f64,
    lock_top_k: f64,
    mood_strength: f64,
    terrain_amp: f64,
    terrain_octaves: f64,
    sun_lon: f64,
    sun_lat: f64,
    planet: Planet,
    exec_mode: ExecMode,
}

impl Default for RawFieldConfig {
    fn default() -> Self {
        FieldConfig::default().into()
    }
}

impl From<FieldConfig> for RawFieldConfig {
    fn from(c: FieldConfig) -> Self {
        Self {
            pareto_tau: c.pareto_tau,
            target_mass: c.target_mass,
            auto_pareto: c.auto_pareto,
            quality_q: c.quality_q,
            intent_axis: c.intent_axis,
            intent_strength: c.intent_strength,
            art_nu: f64::from(c.art_nu),
            art_points: c.art_points as f64,
            lock_top_k: c.lock_top_k as f64,
            mood_strength: c.mood_strength,
            terrain_amp: c.terrain_amp,
            terrain_octaves: f64::from(c.terrain_octaves),
            sun_lon: c.sun_lon,
            sun_lat: c.sun_lat,
            planet: c.planet,
            exec_mode: c.exec_mode,
        }
    }
}

impl From<RawFieldConfig> for FieldConfig {
    fn from(raw: RawFieldConfig) -> Self {
        let (config, notes) = raw.sanitize();
        for note in &notes {
            tracing::warn!(target: "skylens.config", adjustment = %note, "config value sanitized");
        }
        config
    }
}

struct Sanitizer {
    notes: Vec<String>,
}

impl Sanitizer {
    fn note(&mut self, field: &str, from: f64, to: f64) -> f64 {
        self.notes.push(format!("{field}: {from} -> {to}"));
        to
    }

    /// Non-finite or non-positive → `default`.
    fn positive(&mut self, field: &str, v: f64, default: f64) -> f64 {
        if v.is_finite() && v > 0.0 { v } else { self.note(field, v, default) }
    }

    /// Non-finite → `default`, otherwise clamp.
    fn clamped(&mut self, field: &str, v: f64, lo: f64, hi: f64, default: f64) -> f64 {
        if !v.is_finite() {
            return self.note(field, v, default);
        }
        let c = v.clamp(lo, hi);
        if c != v { self.note(field, v, c) } else { v }
    }

    /// Non-finite → `default`, then clamp and truncate to an integer.
    fn count(&mut self, field: &str, v: f64, lo: f64, hi: f64, default: f64) -> f64 {
        let c = self.clamped(field, v, lo, hi, default);
        c.trunc()
    }
}

impl RawFieldConfig {
    fn sanitize(self) -> (FieldConfig, Vec<String>) {
        let d = FieldConfig::default();
        let mut s = Sanitizer { notes: Vec::new() };

        let art_nu = if self.art_nu.is_finite() && self.art_nu >= 1.0 {
            s.count("art_nu", self.art_nu, 1.0, f64::from(MAX_ART_NU), 3.0)
        } else {
            s.note("art_nu", self.art_nu, f64::from(d.art_nu))
        };

        let config = FieldConfig {
            pareto_tau: s.positive("pareto_tau", self.pareto_tau, d.pareto_tau),
            target_mass: s.clamped("target_mass", self.target_mass, 0.5, 0.95, d.target_mass),
            auto_pareto: self.auto_pareto,
            quality_q: s.positive("quality_q", self.quality_q, d.quality_q),
            intent_axis: self.intent_axis,
            intent_strength: s.clamped(
                "intent_strength",
                self.intent_strength,
                0.0,
                MAX_STRENGTH,
                d.intent_strength,
            ),
            art_nu: art_nu as u32,
            art_points: s.count(
                "art_points",
                self.art_points,
                MIN_ART_POINTS as f64,
                MAX_ART_POINTS as f64,
                d.art_points as f64,
            ) as usize,
            lock_top_k: s.count("lock_top_k", self.lock_top_k, 0.0, MAX_ART_POINTS as f64, 0.0)
                as usize,
            mood_strength: s.clamped(
                "mood_strength",
                self.mood_strength,
                0.0,
                MAX_STRENGTH,
                d.mood_strength,
            ),
            terrain_amp: s.clamped("terrain_amp", self.terrain_amp, 0.0, 1.0, d.terrain_amp),
            terrain_octaves: s.count(
                "terrain_octaves",
                self.terrain_octaves,
                1.0,
                f64::from(MAX_TERRAIN_OCTAVES),
                f64::from(d.terrain_octaves),
            ) as u32,
            sun_lon: s.clamped("sun_lon", self.sun_lon, -180.0, 180.0, d.sun_lon),
            sun_lat: s.clamped("sun_lat", self.sun_lat, -90.0, 90.0, d.sun_lat),
            planet: self.planet,
            exec_mode: self.exec_mode,
        };
        (config, s.notes)
    }
}
