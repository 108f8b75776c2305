#![forbid(unsafe_code)]

//! Spherical coordinates, frame conversion, and the two projection families.
//!
//! All angles are in degrees at the API boundary. Three coordinate spaces are
//! involved:
//!
//! ```text
//!   GeoCoord (lon, lat)  ──geographic_to_horizontal──▶  HorizontalCoord (az, alt)
//!          │                                                    │
//!   orthographic (sub-point)                            polar zenith-distance
//!          ▼                                                    ▼
//!                    PlanePoint (x right, y up, unit disk)
//!                                  │
//!                           Viewport::to_screen
//!                                  ▼
//!                    ScreenPoint (pixels, y down)
//! ```
//!
//! # Invariants
//!
//! 1. [`great_circle_deg`] is the only angular separation measure. It is
//!    symmetric, non-negative and bounded by 180.
//! 2. Inverse projections return `None` outside the unit disk instead of
//!    extrapolating.
//! 3. Longitudes are wrapped to `(-180, 180]`, azimuths to `[0, 360)`.

use serde::{Deserialize, Serialize};

/// Fraction of the viewport radius covered by the sky disk.
pub const SKY_DISK_SCALE: f64 = 0.9;

/// Fraction of `min(width, height)` used as the globe radius.
pub const VIEWPORT_RADIUS_FRACTION: f64 = 0.42;

/// A direction on the planet, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoCoord {
    pub lon: f64,
    pub lat: f64,
}

impl GeoCoord {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Unit vector in the planet-fixed frame (x toward lon 0, z toward the
    /// north pole).
    #[must_use]
    pub fn unit_vector(self) -> [f64; 3] {
        let lam = self.lon.to_radians();
        let phi = self.lat.to_radians();
        [phi.cos() * lam.cos(), phi.cos() * lam.sin(), phi.sin()]
    }
}

/// A direction in the observer's sky, in degrees. Azimuth is measured from
/// north through east.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HorizontalCoord {
    pub az: f64,
    pub alt: f64,
}

impl HorizontalCoord {
    #[must_use]
    pub const fn new(az: f64, alt: f64) -> Self {
        Self { az, alt }
    }

    /// Unit vector in the local horizon frame: x east, y north, z zenith.
    #[must_use]
    pub fn unit_vector(self) -> [f64; 3] {
        let az = self.az.to_radians();
        let alt = self.alt.to_radians();
        let c = alt.cos();
        [c * az.sin(), c * az.cos(), alt.sin()]
    }

    /// Inverse of [`HorizontalCoord::unit_vector`]. The input need not be
    /// normalized; a zero vector yields the zenith.
    #[must_use]
    pub fn from_vector(v: [f64; 3]) -> Self {
        let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        if norm <= f64::EPSILON {
            return Self::new(0.0, 90.0);
        }
        let alt = (v[2] / norm).clamp(-1.0, 1.0).asin().to_degrees();
        let az = wrap_azimuth(v[0].atan2(v[1]).to_degrees());
        Self { az, alt }
    }

    /// Great-circle separation between two sky directions.
    #[must_use]
    pub fn separation(self, other: Self) -> f64 {
        great_circle_deg(self.as_sphere(), other.as_sphere())
    }

    /// Treat (az, alt) as (lon, lat) on the celestial sphere.
    fn as_sphere(self) -> GeoCoord {
        GeoCoord::new(self.az, self.alt)
    }
}

/// A point on the projection plane: x right, y up, the visible disk has
/// radius 1 (before terrain inflation).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlanePoint {
    pub x: f64,
    pub y: f64,
}

impl PlanePoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn radius(self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// A point in host pixels (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_sq(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Pixel extent of the host canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Viewport {
    /// Build a viewport, replacing non-finite or non-positive sizes with 1px.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        let sane = |v: f64| if v.is_finite() && v > 0.0 { v } else { 1.0 };
        Self {
            width: sane(width),
            height: sane(height),
        }
    }

    #[must_use]
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Globe radius in pixels.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.width.min(self.height) * VIEWPORT_RADIUS_FRACTION
    }

    /// Map a plane point into pixels. `scale` shrinks the disk (1.0 for the
    /// globe, [`SKY_DISK_SCALE`] for the sky).
    #[must_use]
    pub fn to_screen(&self, p: PlanePoint, scale: f64) -> ScreenPoint {
        let c = self.center();
        let r = self.radius() * scale;
        ScreenPoint::new(c.x + p.x * r, c.y - p.y * r)
    }

    /// Inverse of [`Viewport::to_screen`].
    #[must_use]
    pub fn to_plane(&self, s: ScreenPoint, scale: f64) -> PlanePoint {
        let c = self.center();
        let r = (self.radius() * scale).max(f64::EPSILON);
        PlanePoint::new((s.x - c.x) / r, (c.y - s.y) / r)
    }
}

/// Wrap a longitude into `(-180, 180]`.
#[must_use]
pub fn wrap_longitude(lon: f64) -> f64 {
    let w = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if w <= -180.0 { w + 360.0 } else { w }
}

/// Wrap an azimuth into `[0, 360)`.
#[must_use]
pub fn wrap_azimuth(az: f64) -> f64 {
    let w = az.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if w >= 360.0 { 0.0 } else { w }
}

/// Shortest signed angular difference `to - from`, in `[-180, 180)`.
#[must_use]
pub fn shortest_angle_delta(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

/// Great-circle (haversine) distance in degrees.
#[must_use]
pub fn great_circle_deg(a: GeoCoord, b: GeoCoord) -> f64 {
    let p1 = a.lat.to_radians();
    let p2 = b.lat.to_radians();
    let dp = p2 - p1;
    let dl = (b.lon - a.lon).to_radians();
    let h = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    (2.0 * h.clamp(0.0, 1.0).sqrt().asin()).to_degrees()
}

/// Convert a geographic direction into the sky of an observer standing at
/// `observer`.
#[must_use]
pub fn geographic_to_horizontal(p: GeoCoord, observer: GeoCoord) -> HorizontalCoord {
    let lam = p.lon.to_radians();
    let phi = p.lat.to_radians();
    let lam0 = observer.lon.to_radians();
    let phi0 = observer.lat.to_radians();
    let dl = lam - lam0;

    let sin_alt = (phi0.sin() * phi.sin() + phi0.cos() * phi.cos() * dl.cos()).clamp(-1.0, 1.0);
    let az = (dl.sin() * phi.cos()).atan2(phi0.cos() * phi.sin() - phi0.sin() * phi.cos() * dl.cos());

    HorizontalCoord {
        az: wrap_azimuth(az.to_degrees()),
        alt: sin_alt.asin().to_degrees(),
    }
}

/// Inverse of [`geographic_to_horizontal`].
#[must_use]
pub fn horizontal_to_geographic(h: HorizontalCoord, observer: GeoCoord) -> GeoCoord {
    destination(observer, 90.0 - h.alt, h.az)
}

/// Point reached by travelling `distance_deg` along the great circle leaving
/// `origin` with initial `bearing_deg` (north through east).
#[must_use]
pub fn destination(origin: GeoCoord, distance_deg: f64, bearing_deg: f64) -> GeoCoord {
    let phi1 = origin.lat.to_radians();
    let lam1 = origin.lon.to_radians();
    let d = distance_deg.to_radians();
    let t = bearing_deg.to_radians();

    let phi2 = (phi1.sin() * d.cos() + phi1.cos() * d.sin() * t.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let lam2 = lam1 + (t.sin() * d.sin() * phi1.cos()).atan2(d.cos() - phi1.sin() * phi2.sin());

    GeoCoord {
        lon: wrap_longitude(lam2.to_degrees()),
        lat: phi2.to_degrees(),
    }
}

/// Boundary of the spherical cap of `radius_deg` around `center`, sampled
/// at `steps + 1` points (first and last coincide).
#[must_use]
pub fn small_circle(center: GeoCoord, radius_deg: f64, steps: usize) -> Vec<GeoCoord> {
    let steps = steps.max(3);
    (0..=steps)
        .map(|i| {
            let bearing = 360.0 * i as f64 / steps as f64;
            destination(center, radius_deg, bearing)
        })
        .collect()
}

/// Orthographic projection around the sub-point.
///
/// Returns the plane point and whether it lies on the front hemisphere.
/// `elevation` inflates the radius to `1 + elevation`.
#[must_use]
pub fn project_orthographic(p: GeoCoord, sub_point: GeoCoord, elevation: f64) -> (PlanePoint, bool) {
    let lam = p.lon.to_radians();
    let phi = p.lat.to_radians();
    let lam0 = sub_point.lon.to_radians();
    let phi0 = sub_point.lat.to_radians();
    let dl = lam - lam0;

    let cos_c = phi0.sin() * phi.sin() + phi0.cos() * phi.cos() * dl.cos();
    let r = 1.0 + elevation;
    let x = r * phi.cos() * dl.sin();
    let y = r * (phi0.cos() * phi.sin() - phi0.sin() * phi.cos() * dl.cos());
    (PlanePoint::new(x, y), cos_c >= 0.0)
}

/// Inverse orthographic projection (terrain relief ignored).
#[must_use]
pub fn unproject_orthographic(p: PlanePoint, sub_point: GeoCoord) -> Option<GeoCoord> {
    let rho = p.radius();
    if !rho.is_finite() || rho > 1.0 {
        return None;
    }
    if rho <= f64::EPSILON {
        return Some(sub_point);
    }
    let lam0 = sub_point.lon.to_radians();
    let phi0 = sub_point.lat.to_radians();
    let c = rho.asin();

    let phi = (c.cos() * phi0.sin() + p.y * c.sin() * phi0.cos() / rho)
        .clamp(-1.0, 1.0)
        .asin();
    let lam = lam0 + (p.x * c.sin()).atan2(rho * phi0.cos() * c.cos() - p.y * phi0.sin() * c.sin());

    Some(GeoCoord {
        lon: wrap_longitude(lam.to_degrees()),
        lat: phi.to_degrees(),
    })
}

/// Zenith-centred polar projection: radius is the zenith distance over 90.
#[must_use]
pub fn project_horizontal(h: HorizontalCoord) -> (PlanePoint, bool) {
    let r = (90.0 - h.alt) / 90.0;
    let th = h.az.to_radians();
    (PlanePoint::new(r * th.sin(), r * th.cos()), h.alt >= 0.0)
}

/// Inverse of [`project_horizontal`], defined on the horizon disk only.
#[must_use]
pub fn unproject_horizontal(p: PlanePoint) -> Option<HorizontalCoord> {
    let r = p.radius();
    if !r.is_finite() || r > 1.0 {
        return None;
    }
    Some(HorizontalCoord {
        az: wrap_azimuth(p.x.atan2(p.y).to_degrees()),
        alt: 90.0 - r * 90.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn wrap_longitude_half_open_range() {
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(-180.0), 180.0);
        assert!(close(wrap_longitude(190.0), -170.0, 1e-12));
        assert!(close(wrap_longitude(-190.0), 170.0, 1e-12));
        assert!(close(wrap_longitude(720.5), 0.5, 1e-9));
    }

    #[test]
    fn wrap_azimuth_never_returns_360() {
        assert_eq!(wrap_azimuth(360.0), 0.0);
        assert_eq!(wrap_azimuth(-1e-18), 0.0);
        assert!(close(wrap_azimuth(-90.0), 270.0, 1e-12));
    }

    #[test]
    fn shortest_delta_crosses_north() {
        assert!(close(shortest_angle_delta(350.0, 10.0), 20.0, 1e-12));
        assert!(close(shortest_angle_delta(10.0, 350.0), -20.0, 1e-12));
    }

    #[test]
    fn quarter_circle_distance() {
        let d = great_circle_deg(GeoCoord::new(0.0, 0.0), GeoCoord::new(90.0, 0.0));
        assert!(close(d, 90.0, 1e-9));
        let antipode = great_circle_deg(GeoCoord::new(10.0, 20.0), GeoCoord::new(-170.0, -20.0));
        assert!(close(antipode, 180.0, 1e-6));
    }

    #[test]
    fn sub_point_is_at_zenith() {
        let obs = GeoCoord::new(30.0, 45.0);
        let h = geographic_to_horizontal(obs, obs);
        assert!(close(h.alt, 90.0, 1e-9));
    }

    #[test]
    fn north_of_observer_has_zero_azimuth() {
        let obs = GeoCoord::new(0.0, 0.0);
        let h = geographic_to_horizontal(GeoCoord::new(0.0, 30.0), obs);
        assert!(close(h.az, 0.0, 1e-9));
        assert!(close(h.alt, 60.0, 1e-9));
        let east = geographic_to_horizontal(GeoCoord::new(30.0, 0.0), obs);
        assert!(close(east.az, 90.0, 1e-9));
    }

    #[test]
    fn horizontal_round_trip_through_geographic() {
        let obs = GeoCoord::new(-40.0, 15.0);
        let h = HorizontalCoord::new(123.0, 37.0);
        let g = horizontal_to_geographic(h, obs);
        let back = geographic_to_horizontal(g, obs);
        assert!(close(back.az, h.az, 1e-7));
        assert!(close(back.alt, h.alt, 1e-7));
    }

    #[test]
    fn orthographic_centre_and_limb() {
        let sub = GeoCoord::new(0.0, 15.0);
        let (p, visible) = project_orthographic(sub, sub, 0.0);
        assert!(visible);
        assert!(p.radius() < 1e-12);

        let (_, back_visible) = project_orthographic(GeoCoord::new(180.0, -15.0), sub, 0.0);
        assert!(!back_visible);
    }

    #[test]
    fn elevation_inflates_radius() {
        let sub = GeoCoord::new(0.0, 0.0);
        let (flat, _) = project_orthographic(GeoCoord::new(60.0, 0.0), sub, 0.0);
        let (raised, _) = project_orthographic(GeoCoord::new(60.0, 0.0), sub, 0.1);
        assert!(close(raised.radius(), flat.radius() * 1.1, 1e-12));
    }

    #[test]
    fn inverse_fails_outside_disk() {
        assert!(unproject_orthographic(PlanePoint::new(0.8, 0.8), GeoCoord::default()).is_none());
        assert!(unproject_horizontal(PlanePoint::new(1.01, 0.0)).is_none());
        assert!(unproject_horizontal(PlanePoint::new(f64::NAN, 0.0)).is_none());
    }

    #[test]
    fn sky_projection_puts_north_up() {
        let (p, visible) = project_horizontal(HorizontalCoord::new(0.0, 0.0));
        assert!(visible);
        assert!(close(p.x, 0.0, 1e-12));
        assert!(close(p.y, 1.0, 1e-12));
        let (_, below) = project_horizontal(HorizontalCoord::new(0.0, -1.0));
        assert!(!below);
    }

    #[test]
    fn viewport_round_trip() {
        let vp = Viewport::new(640.0, 480.0);
        let p = PlanePoint::new(0.25, -0.5);
        let back = vp.to_plane(vp.to_screen(p, SKY_DISK_SCALE), SKY_DISK_SCALE);
        assert!(close(back.x, p.x, 1e-12));
        assert!(close(back.y, p.y, 1e-12));
    }

    #[test]
    fn small_circle_stays_on_radius() {
        let c = GeoCoord::new(20.0, 50.0);
        for p in small_circle(c, 20.0, 36) {
            assert!(close(great_circle_deg(c, p), 20.0, 1e-6));
        }
    }

    #[test]
    fn sky_vector_round_trip() {
        let h = HorizontalCoord::new(300.0, 25.0);
        let back = HorizontalCoord::from_vector(h.unit_vector());
        assert!(close(back.az, 300.0, 1e-9));
        assert!(close(back.alt, 25.0, 1e-9));
    }
}
