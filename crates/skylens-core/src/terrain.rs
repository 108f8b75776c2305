#![forbid(unsafe_code)]

//! Procedural planet relief: seeded 3-D value noise summed into fBm on the
//! unit sphere, shaped per planet, plus a finite-difference illumination
//! estimate.
//!
//! Noise is evaluated on the unit vector of each direction, so the field is
//! continuous across the antimeridian and at the poles.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geo::{GeoCoord, great_circle_deg};

/// Step (degrees) for the elevation finite differences.
const NORMAL_STEP_DEG: f64 = 0.5;

/// Gain applied to elevation differences when bending the normal.
const NORMAL_RELIEF_GAIN: f64 = 50.0;

/// Planet shaping model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Planet {
    #[default]
    Earth,
    Mars,
}

impl Planet {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Earth => "earth",
            Self::Mars => "mars",
        }
    }

    /// Parse a planet name; unknown names fall back to Earth.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mars" => Self::Mars,
            _ => Self::Earth,
        }
    }
}

impl Serialize for Planet {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Planet {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Self::parse(&raw))
    }
}

/// Fractal Brownian motion parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalParams {
    pub octaves: u32,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Amplitude multiplier per octave.
    pub gain: f64,
    /// Base frequency applied to the unit vector.
    pub scale: f64,
    pub seed: i32,
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.2,
            gain: 0.5,
            scale: 1.2,
            seed: 1,
        }
    }
}

fn hash3(x: i32, y: i32, z: i32) -> f64 {
    let mut h = (x as u32)
        .wrapping_mul(374_761_393)
        .wrapping_add((y as u32).wrapping_mul(668_265_263))
        .wrapping_add((z as u32).wrapping_mul(73_856_093));
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^= h >> 16;
    f64::from(h) / 4_294_967_296.0
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Trilinearly interpolated lattice noise in `[-1, 1]`.
#[must_use]
pub fn value_noise_3d(x: f64, y: f64, z: f64) -> f64 {
    let (xf, yf, zf) = (x.floor(), y.floor(), z.floor());
    let (xi, yi, zi) = (xf as i32, yf as i32, zf as i32);
    let u = smoothstep(x - xf);
    let v = smoothstep(y - yf);
    let w = smoothstep(z - zf);

    let c = |dx: i32, dy: i32, dz: i32| hash3(xi + dx, yi + dy, zi + dz);

    let x00 = lerp(c(0, 0, 0), c(1, 0, 0), u);
    let x10 = lerp(c(0, 1, 0), c(1, 1, 0), u);
    let x01 = lerp(c(0, 0, 1), c(1, 0, 1), u);
    let x11 = lerp(c(0, 1, 1), c(1, 1, 1), u);
    let y0 = lerp(x00, x10, v);
    let y1 = lerp(x01, x11, v);
    lerp(y0, y1, w) * 2.0 - 1.0
}

fn sphere_noise(p: GeoCoord, scale: f64, seed: i32) -> f64 {
    let [x, y, z] = p.unit_vector();
    let s = f64::from(seed) * 0.12345 + 100.0;
    value_noise_3d(x * scale + s, y * scale + 2.0 * s, z * scale + 3.0 * s)
}

/// Normalized fBm over the sphere, roughly in `[-1, 1]`.
#[must_use]
pub fn fbm_sphere(p: GeoCoord, params: &FractalParams) -> f64 {
    let mut amp = 1.0;
    let mut freq = 1.0;
    let mut sum = 0.0;
    let mut norm = 0.0;
    for o in 0..params.octaves.max(1) {
        let seed = params.seed.wrapping_add((o as i32).wrapping_mul(13));
        sum += amp * sphere_noise(p, params.scale * freq, seed);
        norm += amp;
        amp *= params.gain;
        freq *= params.lacunarity;
    }
    if norm > 0.0 { sum / norm } else { 0.0 }
}

/// Smooth Gaussian hump of angular width `sigma_deg` centred on `center`.
#[must_use]
pub fn gauss_bump(p: GeoCoord, center: GeoCoord, sigma_deg: f64) -> f64 {
    let d = great_circle_deg(p, center);
    (-(d * d) / (2.0 * sigma_deg * sigma_deg)).exp()
}

/// Seeded relief and lighting for one planet.
#[derive(Debug, Clone, PartialEq)]
pub struct Terrain {
    pub planet: Planet,
    pub amplitude: f64,
    pub octaves: u32,
    /// Sub-solar point.
    pub sun: GeoCoord,
}

impl Default for Terrain {
    fn default() -> Self {
        Self {
            planet: Planet::Earth,
            amplitude: 0.036,
            octaves: 4,
            sun: GeoCoord::new(0.0, 20.0),
        }
    }
}

impl Terrain {
    /// Signed elevation, already scaled by the amplitude. Used as the
    /// multiplicative radius offset of the planetary projection.
    #[must_use]
    pub fn elevation(&self, p: GeoCoord) -> f64 {
        let raw = match self.planet {
            Planet::Earth => {
                let n = fbm_sphere(
                    p,
                    &FractalParams {
                        octaves: self.octaves,
                        lacunarity: 2.1,
                        gain: 0.5,
                        scale: 1.3,
                        seed: 7,
                    },
                );
                // Oceans are flattened relative to land.
                if n > 0.0 { n * 0.8 } else { n * 0.3 }
            }
            Planet::Mars => {
                let n = fbm_sphere(
                    p,
                    &FractalParams {
                        octaves: self.octaves.saturating_sub(1).max(1),
                        lacunarity: 2.0,
                        gain: 0.55,
                        scale: 0.9,
                        seed: 21,
                    },
                ) * 0.7;
                let tharsis = gauss_bump(p, GeoCoord::new(-110.0, -10.0), 35.0) * 0.9;
                let olympus = gauss_bump(p, GeoCoord::new(-133.0, 18.0), 9.0) * 1.2;
                n + tharsis + olympus * 1.4
            }
        };
        raw * self.amplitude
    }

    /// Unit vector toward the sun.
    #[must_use]
    pub fn sun_direction(&self) -> [f64; 3] {
        self.sun.unit_vector()
    }

    /// Lambertian illumination in `[0, 1]` of the relief-bent surface normal.
    #[must_use]
    pub fn illumination(&self, p: GeoCoord) -> f64 {
        let lam = p.lon.to_radians();
        let phi = p.lat.to_radians();
        let n0 = p.unit_vector();
        let d = NORMAL_STEP_DEG;

        let ex = self.elevation(GeoCoord::new(p.lon + d, p.lat))
            - self.elevation(GeoCoord::new(p.lon - d, p.lat));
        let ey = self.elevation(GeoCoord::new(p.lon, p.lat + d))
            - self.elevation(GeoCoord::new(p.lon, p.lat - d));

        let t_lon = [-phi.cos() * lam.sin(), phi.cos() * lam.cos(), 0.0];
        let t_lat = [-phi.sin() * lam.cos(), -phi.sin() * lam.sin(), phi.cos()];

        let mut n = [0.0; 3];
        for i in 0..3 {
            n[i] = n0[i]
                - ex * NORMAL_RELIEF_GAIN * t_lon[i]
                - ey * NORMAL_RELIEF_GAIN * t_lat[i];
        }
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        let len = if len > 0.0 { len } else { 1.0 };
        let s = self.sun_direction();
        ((n[0] * s[0] + n[1] * s[1] + n[2] * s[2]) / len).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_noise_bounded() {
        for i in 0..500 {
            let t = f64::from(i) * 0.173;
            let v = value_noise_3d(t, -t * 0.7, t * 1.3 + 5.0);
            assert!((-1.0..=1.0).contains(&v), "noise out of range: {v}");
        }
    }

    #[test]
    fn elevation_is_deterministic() {
        let terrain = Terrain::default();
        let p = GeoCoord::new(12.5, -33.0);
        assert_eq!(terrain.elevation(p), terrain.elevation(p));
    }

    #[test]
    fn elevation_continuous_across_antimeridian() {
        let terrain = Terrain::default();
        let west = terrain.elevation(GeoCoord::new(-180.0, 10.0));
        let east = terrain.elevation(GeoCoord::new(180.0, 10.0));
        assert!((west - east).abs() < 1e-9);
    }

    #[test]
    fn zero_amplitude_is_flat() {
        let terrain = Terrain {
            amplitude: 0.0,
            ..Terrain::default()
        };
        assert_eq!(terrain.elevation(GeoCoord::new(40.0, 40.0)), 0.0);
    }

    #[test]
    fn flat_planet_lit_like_a_sphere() {
        let terrain = Terrain {
            amplitude: 0.0,
            sun: GeoCoord::new(0.0, 0.0),
            ..Terrain::default()
        };
        let noon = terrain.illumination(GeoCoord::new(0.0, 0.0));
        assert!((noon - 1.0).abs() < 1e-9);
        let night = terrain.illumination(GeoCoord::new(180.0, 0.0));
        assert_eq!(night, 0.0);
    }

    #[test]
    fn illumination_bounded() {
        let terrain = Terrain {
            planet: Planet::Mars,
            amplitude: 0.2,
            ..Terrain::default()
        };
        for lon in (-180..180).step_by(30) {
            for lat in (-80..=80).step_by(20) {
                let l = terrain.illumination(GeoCoord::new(f64::from(lon), f64::from(lat)));
                assert!((0.0..=1.0 + 1e-12).contains(&l));
            }
        }
    }

    #[test]
    fn mars_has_a_tharsis_bulge() {
        let terrain = Terrain {
            planet: Planet::Mars,
            amplitude: 1.0,
            ..Terrain::default()
        };
        let bulge = terrain.elevation(GeoCoord::new(-133.0, 18.0));
        let far = terrain.elevation(GeoCoord::new(60.0, -10.0));
        assert!(bulge > far);
    }

    #[test]
    fn planet_names_parse_leniently() {
        assert_eq!(Planet::parse("MARS"), Planet::Mars);
        assert_eq!(Planet::parse("venus"), Planet::Earth);
    }
}
