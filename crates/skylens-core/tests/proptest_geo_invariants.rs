//! Property-based invariant tests for coordinates and projections.
//!
//! 1. great_circle_deg is symmetric
//! 2. great_circle_deg is bounded in [0, 180] and zero on identical input
//! 3. great_circle_deg is positive for distinct latitudes
//! 4. wrap_longitude lands in (-180, 180], wrap_azimuth in [0, 360)
//! 5. shortest_angle_delta lands in [-180, 180) and reaches the target
//! 6. Orthographic forward-then-inverse round-trips for visible points
//! 7. Sky forward-then-inverse round-trips for points above the horizon
//! 8. horizontal -> geographic -> horizontal round-trips
//! 9. Projection visibility matches the hemisphere / horizon test

use proptest::prelude::*;
use skylens_core::geo::{
    GeoCoord, HorizontalCoord, geographic_to_horizontal, great_circle_deg,
    horizontal_to_geographic, project_horizontal, project_orthographic, shortest_angle_delta,
    unproject_horizontal, unproject_orthographic, wrap_azimuth, wrap_longitude,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn arb_geo() -> impl Strategy<Value = GeoCoord> {
    (-180.0f64..180.0, -90.0f64..=90.0).prop_map(|(lon, lat)| GeoCoord::new(lon, lat))
}

fn arb_observer() -> impl Strategy<Value = GeoCoord> {
    (-180.0f64..180.0, -80.0f64..=80.0).prop_map(|(lon, lat)| GeoCoord::new(lon, lat))
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Great-circle distance
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn great_circle_symmetric(a in arb_geo(), b in arb_geo()) {
        let ab = great_circle_deg(a, b);
        let ba = great_circle_deg(b, a);
        prop_assert!((ab - ba).abs() < 1e-9, "d(a,b)={} d(b,a)={}", ab, ba);
    }

    #[test]
    fn great_circle_bounded(a in arb_geo(), b in arb_geo()) {
        let d = great_circle_deg(a, b);
        prop_assert!((0.0..=180.0).contains(&d), "d = {}", d);
        prop_assert_eq!(great_circle_deg(a, a), 0.0);
    }

    #[test]
    fn great_circle_positive_for_distinct(a in arb_geo(), dlat in 0.001f64..10.0) {
        let lat = if a.lat + dlat <= 90.0 { a.lat + dlat } else { a.lat - dlat };
        let b = GeoCoord::new(a.lon, lat);
        prop_assert!(great_circle_deg(a, b) > 0.0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4-5. Wrapping
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn wrapping_ranges(x in -1.0e6f64..1.0e6) {
        let lon = wrap_longitude(x);
        prop_assert!(lon > -180.0 && lon <= 180.0, "lon = {}", lon);
        let az = wrap_azimuth(x);
        prop_assert!((0.0..360.0).contains(&az), "az = {}", az);
    }

    #[test]
    fn shortest_delta_reaches_target(from in 0.0f64..360.0, to in 0.0f64..360.0) {
        let d = shortest_angle_delta(from, to);
        prop_assert!((-180.0..180.0).contains(&d), "delta = {}", d);
        let reached = wrap_azimuth(from + d);
        let err = shortest_angle_delta(reached, to).abs();
        prop_assert!(err < 1e-9, "from={} to={} reached={}", from, to, reached);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6-7. Projection round trips
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn orthographic_round_trip(sub in arb_observer(), p in arb_geo()) {
        // Away from the limb the inverse is well conditioned.
        prop_assume!(great_circle_deg(sub, p) < 80.0);
        let (plane, visible) = project_orthographic(p, sub, 0.0);
        prop_assert!(visible);
        let back = unproject_orthographic(plane, sub);
        prop_assert!(back.is_some());
        let back = back.unwrap_or_default();
        prop_assert!(great_circle_deg(p, back) < 1e-6, "p={:?} back={:?}", p, back);
    }

    #[test]
    fn sky_round_trip(az in 0.0f64..360.0, alt in 0.0f64..89.0) {
        let h = HorizontalCoord::new(az, alt);
        let (plane, visible) = project_horizontal(h);
        prop_assert!(visible);
        let back = unproject_horizontal(plane);
        prop_assert!(back.is_some());
        let back = back.unwrap_or_default();
        prop_assert!(h.separation(back) < 1e-6, "h={:?} back={:?}", h, back);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 8. Frame conversion round trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn horizontal_geographic_round_trip(
        obs in arb_observer(),
        az in 0.0f64..360.0,
        alt in -85.0f64..85.0,
    ) {
        let h = HorizontalCoord::new(az, alt);
        let back = geographic_to_horizontal(horizontal_to_geographic(h, obs), obs);
        prop_assert!(h.separation(back) < 1e-6, "h={:?} back={:?}", h, back);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 9. Visibility
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn visibility_matches_hemisphere(sub in arb_observer(), p in arb_geo()) {
        let d = great_circle_deg(sub, p);
        prop_assume!((d - 90.0).abs() > 1e-6);
        let (_, visible) = project_orthographic(p, sub, 0.0);
        prop_assert_eq!(visible, d < 90.0);

        let h = geographic_to_horizontal(p, sub);
        let (_, above) = project_horizontal(h);
        prop_assert_eq!(above, h.alt >= 0.0);
    }
}
