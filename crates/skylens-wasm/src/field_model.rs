//! Canvas-facing model wrapping an [`Engine`].
//!
//! Everything the page draws comes out of here as flat `f32` buffers:
//!
//! | Buffer | Stride | Layout |
//! |--------|--------|--------|
//! | points | 7 | `x, y, r, g, b, size, locked` |
//! | shading | 5 | `x, y, r, g, b` |
//! | lens outline | 2 | `x, y` |
//!
//! Colours are 0-255 channel values; `locked` is 0 or 1.

use web_time::Duration;

use skylens_core::geo::ScreenPoint;
use skylens_core::{
    ConfigError, Dimension, Engine, FieldConfig, Frame, GeoCoord, Mood, Planet, TickReport,
};

/// Floats per projected point.
pub const POINT_STRIDE: usize = 7;
/// Floats per terrain shading sample.
pub const SHADE_STRIDE: usize = 5;

const SHADE_LAT_STEP_DEG: f64 = 2.5;
const SHADE_LON_STEP_DEG: f64 = 3.0;
const SHADE_LAT_LIMIT_DEG: f64 = 88.0;
const LENS_OUTLINE_STEPS: usize = 180;

const LOCKED_HUE: f64 = 160.0;
const POSITIVE_MOOD_HUE: f64 = 120.0;
const NEGATIVE_MOOD_HUE: f64 = 0.0;
const HUE_PER_DIMENSION: usize = 37;
const LOCKED_SIZE_GAIN: f64 = 1.25;

/// Base hue of a category, spread around the wheel.
#[must_use]
pub fn dimension_hue(dimension: Dimension) -> f64 {
    ((dimension.index() * HUE_PER_DIMENSION) % 360) as f64
}

/// Category hue pulled 30% toward green (positive) or red (negative).
#[must_use]
pub fn point_hue(dimension: Dimension, mood: Mood) -> f64 {
    let anchor = match mood {
        Mood::Positive => POSITIVE_MOOD_HUE,
        Mood::Negative => NEGATIVE_MOOD_HUE,
    };
    dimension_hue(dimension) * 0.7 + anchor * 0.3
}

/// HSL (hue in degrees, saturation and lightness in `[0, 1]`) to 0-255 RGB.
#[must_use]
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [f32; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    [
        ((r + m) * 255.0) as f32,
        ((g + m) * 255.0) as f32,
        ((b + m) * 255.0) as f32,
    ]
}

/// Surface colour for a lit terrain sample; `light` is in `[0, 1]`.
#[must_use]
pub fn shade_color(planet: Planet, light: f64, elevation: f64) -> [f32; 3] {
    let l = light.clamp(0.0, 1.0);
    let rgb = match planet {
        Planet::Earth if elevation < 0.0 => (50.0 + 40.0 * l, 100.0 + 60.0 * l, 160.0 + 80.0 * l),
        Planet::Earth => (60.0 + 60.0 * l, 80.0 + 100.0 * l, 40.0 + 40.0 * l),
        Planet::Mars => (130.0 + 80.0 * l, 60.0 + 40.0 * l, 40.0 + 30.0 * l),
    };
    [rgb.0.floor() as f32, rgb.1.floor() as f32, rgb.2.floor() as f32]
}

/// Draw radius of a point from its weight.
#[must_use]
pub fn point_size(frame: Frame, weight: f64, locked: bool) -> f64 {
    let base = match frame {
        Frame::Planetary => 1.4,
        Frame::Horizontal => 1.2,
    };
    let size = base + 3.8 * weight;
    if locked { size * LOCKED_SIZE_GAIN } else { size }
}

pub struct FieldModel {
    engine: Engine,
    last: Option<TickReport>,
}

impl Default for FieldModel {
    fn default() -> Self {
        Self::new(FieldConfig::default())
    }
}

impl FieldModel {
    #[must_use]
    pub fn new(config: FieldConfig) -> Self {
        Self {
            engine: Engine::new(config),
            last: None,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Most recent tick report, if any tick has run.
    #[must_use]
    pub fn last_report(&self) -> Option<&TickReport> {
        self.last.as_ref()
    }

    /// Parse a JSON config and apply it. On error the engine is untouched.
    pub fn load_config_json(&mut self, json: &str) -> Result<(), ConfigError> {
        let config = FieldConfig::from_json_str(json)?;
        self.engine.apply_config(config);
        Ok(())
    }

    /// Advance by `dt_ms` milliseconds. Non-finite or non-positive steps are
    /// ignored.
    pub fn advance(&mut self, dt_ms: f64) -> Option<&TickReport> {
        if !dt_ms.is_finite() || dt_ms <= 0.0 {
            return None;
        }
        let dt = Duration::try_from_secs_f64(dt_ms / 1000.0).unwrap_or(Duration::MAX);
        self.last = Some(self.engine.tick(dt));
        self.last.as_ref()
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.engine.set_viewport(width, height);
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.engine.pointer_down(ScreenPoint::new(x, y));
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.engine.pointer_move(ScreenPoint::new(x, y));
    }

    pub fn pointer_up(&mut self) {
        self.engine.pointer_up();
    }

    /// Toggle the lock nearest to `(x, y)`; `-1` when nothing is visible.
    pub fn click(&mut self, x: f64, y: f64) -> i64 {
        self.engine
            .click(ScreenPoint::new(x, y))
            .map_or(-1, |i| i as i64)
    }

    /// Flip a category's mood by name. Unknown names are ignored.
    pub fn toggle_mood(&mut self, name: &str) -> Option<Mood> {
        let dimension = Dimension::parse(name)?;
        Some(self.engine.toggle_mood(dimension))
    }

    /// Visible points as `[x, y, r, g, b, size, locked]` records.
    #[must_use]
    pub fn project_to_buffer(&self) -> Vec<f32> {
        let view = self.engine.view();
        let field = self.engine.field();
        let mut buf = Vec::with_capacity(field.len() * POINT_STRIDE);
        for (i, (p, &w)) in field.points().iter().zip(field.weights()).enumerate() {
            let Some(s) = view.project(p.position) else {
                continue;
            };
            let locked = field.is_locked(i);
            let rgb = if locked {
                hsl_to_rgb(LOCKED_HUE, 0.9, 0.6)
            } else {
                hsl_to_rgb(point_hue(p.dimension, p.mood), 0.8, 0.6)
            };
            buf.extend_from_slice(&[
                s.x as f32,
                s.y as f32,
                rgb[0],
                rgb[1],
                rgb[2],
                point_size(view.frame, w, locked) as f32,
                if locked { 1.0 } else { 0.0 },
            ]);
        }
        buf
    }

    /// Lit terrain samples on a lat/lon grid, planetary frame only.
    #[must_use]
    pub fn shade_to_buffer(&self) -> Vec<f32> {
        let view = self.engine.view();
        if view.frame != Frame::Planetary {
            return Vec::new();
        }
        let terrain = self.engine.terrain();
        let mut buf = Vec::new();
        let lat_steps = (2.0 * SHADE_LAT_LIMIT_DEG / SHADE_LAT_STEP_DEG) as usize;
        let lon_steps = (360.0 / SHADE_LON_STEP_DEG) as usize;
        for i in 0..=lat_steps {
            let lat = -SHADE_LAT_LIMIT_DEG + i as f64 * SHADE_LAT_STEP_DEG;
            for j in 0..lon_steps {
                let p = GeoCoord::new(-180.0 + j as f64 * SHADE_LON_STEP_DEG, lat);
                let Some(s) = view.project(p) else {
                    continue;
                };
                let rgb = shade_color(terrain.planet, terrain.illumination(p), terrain.elevation(p));
                buf.extend_from_slice(&[s.x as f32, s.y as f32, rgb[0], rgb[1], rgb[2]]);
            }
        }
        buf
    }

    /// Visible lens boundary as `[x, y]` pairs.
    #[must_use]
    pub fn lens_outline_buffer(&self) -> Vec<f32> {
        self.engine
            .lens_outline(LENS_OUTLINE_STEPS)
            .into_iter()
            .flat_map(|s| [s.x as f32, s.y as f32])
            .collect()
    }

    /// One-line HUD text.
    #[must_use]
    pub fn state_info(&self) -> String {
        let e = &self.engine;
        let field = e.field();
        let (positive, negative) = field.mood_counts();
        let (g, v, k) = self
            .last
            .as_ref()
            .map_or((0.0, 0.0, 0), |r| (r.gauges.g, r.gauges.v, r.head.k));
        format!(
            "{} | tau:{:.2} | head {}/{} | g:{:.3} v:{:.3} | locks:{} | +{} -{} | seed:{}",
            e.frame().as_str(),
            e.temperature(),
            k,
            field.len(),
            g,
            v,
            field.locks().len(),
            positive,
            negative,
            e.seed()
        )
    }

    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.engine.snapshot())
    }
}
