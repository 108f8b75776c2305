//! Property-based invariant tests for point-field generation.
//!
//! 1. Generation yields exactly `art_points` points
//! 2. Weights are finite, non-negative and sum to 1 (1e-6)
//! 3. The maximum normalized salience is exactly 1
//! 4. Generated latitudes stay inside [-89.9, 89.9], longitudes in (-180, 180]
//! 5. The lock set holds the `lock_top_k` highest-salience indices
//! 6. Generation is deterministic for equal inputs
//! 7. softmax_weights sums to 1 for arbitrary finite input and temperature
//! 8. Reweighting keeps the salience ordering of the weights
//! 9. Lock toggles never reference indices outside the field

use proptest::prelude::*;
use skylens_core::config::{FieldConfig, IntentAxis};
use skylens_core::geo::GeoCoord;
use skylens_core::sampler::{Dimension, Field, Mood, MoodMap, generate, softmax_weights};

// ── Helpers ──────────────────────────────────────────────────────────

fn arb_axis() -> impl Strategy<Value = IntentAxis> {
    prop_oneof![
        Just(IntentAxis::Radial),
        Just(IntentAxis::Lon),
        Just(IntentAxis::Lat),
    ]
}

fn arb_config() -> impl Strategy<Value = FieldConfig> {
    (
        10usize..=300,
        1u32..=12,
        0.01f64..2.0,
        arb_axis(),
        0.0f64..5.0,
        0.0f64..8.0,
        0usize..=40,
    )
        .prop_map(|(art_points, art_nu, pareto_tau, intent_axis, intent_strength, mood_strength, lock_top_k)| {
            FieldConfig {
                art_points,
                art_nu,
                pareto_tau,
                intent_axis,
                intent_strength,
                mood_strength,
                lock_top_k,
                ..FieldConfig::default()
            }
        })
}

fn arb_moods() -> impl Strategy<Value = MoodMap> {
    proptest::collection::vec(any::<bool>(), 9).prop_map(|flags| {
        let mut moods = MoodMap::default();
        for (d, negative) in Dimension::ALL.into_iter().zip(flags) {
            if negative {
                moods.set(d, Mood::Negative);
            }
        }
        moods
    })
}

fn arb_focus() -> impl Strategy<Value = GeoCoord> {
    (-180.0f64..180.0, -89.0f64..89.0).prop_map(|(lon, lat)| GeoCoord::new(lon, lat))
}

fn assert_weights_valid(weights: &[f64]) -> Result<(), TestCaseError> {
    let mut sum = 0.0;
    for &w in weights {
        prop_assert!(w.is_finite() && w >= 0.0, "bad weight {}", w);
        sum += w;
    }
    prop_assert!((sum - 1.0).abs() < 1e-6, "weights sum to {}", sum);
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// 1-5. Generated fields
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn generated_field_is_well_formed(
        config in arb_config(),
        focus in arb_focus(),
        seed in any::<u32>(),
        moods in arb_moods(),
    ) {
        let field = generate(focus, &config, config.pareto_tau, seed, &moods, 1);

        prop_assert_eq!(field.len(), config.art_points);
        prop_assert_eq!(field.weights().len(), config.art_points);
        assert_weights_valid(field.weights())?;

        let max = field.points().iter().map(|p| p.salience).fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(max, 1.0);

        for p in field.points() {
            prop_assert!(p.salience >= 0.0 && p.salience <= 1.0);
            prop_assert!(p.position.lat.abs() <= 89.9);
            prop_assert!(p.position.lon > -180.0 && p.position.lon <= 180.0);
        }

        let expected: Vec<usize> = field.top_by_salience(config.lock_top_k);
        let locked: Vec<usize> = field.locks().iter().copied().collect();
        let mut expected_sorted = expected.clone();
        expected_sorted.sort_unstable();
        prop_assert_eq!(locked, expected_sorted);
        prop_assert_eq!(field.locks().len(), config.lock_top_k.min(config.art_points));

        // Every locked point is at least as salient as every unlocked one.
        let min_locked = field
            .locks()
            .iter()
            .map(|&i| field.points()[i].salience)
            .fold(f64::INFINITY, f64::min);
        for (i, p) in field.points().iter().enumerate() {
            if !field.is_locked(i) {
                prop_assert!(p.salience <= min_locked);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn generation_deterministic(config in arb_config(), focus in arb_focus(), seed in any::<u32>()) {
        let moods = MoodMap::default();
        let a = generate(focus, &config, 0.55, seed, &moods, 3);
        let b = generate(focus, &config, 0.55, seed, &moods, 3);
        prop_assert_eq!(a, b);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7-8. Softmax and reweighting
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn softmax_normalized(
        salience in proptest::collection::vec(-50.0f64..50.0, 1..200),
        temperature in -1.0f64..5.0,
    ) {
        assert_weights_valid(&softmax_weights(&salience, temperature))?;
    }

    #[test]
    fn reweight_preserves_order(
        config in arb_config(),
        seed in any::<u32>(),
        temperature in 0.0f64..2.0,
    ) {
        let mut field = generate(GeoCoord::default(), &config, 0.55, seed, &MoodMap::default(), 1);
        field.reweight(temperature);
        assert_weights_valid(field.weights())?;
        let pts = field.points();
        let w = field.weights();
        for i in 0..pts.len() {
            for j in 0..pts.len() {
                if pts[i].salience > pts[j].salience {
                    prop_assert!(w[i] >= w[j]);
                }
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 9. Lock toggles
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn lock_toggles_stay_in_range(
        config in arb_config(),
        toggles in proptest::collection::vec(0usize..400, 0..50),
    ) {
        let mut field: Field = generate(GeoCoord::default(), &config, 0.55, 1, &MoodMap::default(), 1);
        for i in toggles {
            let was = field.is_locked(i);
            let now = field.toggle_lock(i);
            if i < field.len() {
                prop_assert_eq!(now, !was);
            } else {
                prop_assert!(!now);
            }
        }
        prop_assert!(field.locks().iter().all(|&i| i < field.len()));
    }
}
