#![forbid(unsafe_code)]

//! The session context that owns every piece of mutable state.
//!
//! The host drives an [`Engine`] with two kinds of calls:
//!
//! - **Ticks**: [`Engine::tick`] once per animation frame. A tick runs the
//!   temperature controller, steers the lens (horizontal frame only), then
//!   computes gauges and lens scores from the tick's updated weights.
//! - **Discrete events**: configuration changes, reseeds, frame toggles,
//!   mood toggles, lock edits and pointer input. Events that change what
//!   the sampler would produce regenerate the field immediately.
//!
//! # Invariants
//!
//! 1. `dt` is clamped to [`MAX_TICK_SECS`] so a stalled host cannot destabilize
//!    the controller.
//! 2. Regeneration replaces points, weights and locks in one assignment.
//! 3. The observer latitude stays within ±[`MAX_OBSERVER_LAT`].
//! 4. Nothing here returns an error; degenerate inputs fall back to no-ops.
//!
//! # Regeneration triggers
//!
//! | Event | Regenerates |
//! |-------|-------------|
//! | `apply_config`, `reseed`, `set_seed` | yes |
//! | `toggle_frame` / `set_frame` | yes |
//! | `toggle_mood` | yes |
//! | lens release after a drag, `set_lens_focus` | yes |
//! | lens drag moves, director steering | no |
//! | observer drag, lock edits, temperature changes | no |

use serde::Serialize;
use web_time::{Duration, Instant};

use crate::config::{ExecMode, FieldConfig};
use crate::controller::{HeadStats, WeightController, head_stats};
use crate::director::{Director, DirectorTarget};
use crate::frame::{Frame, FramePoint, FrameView};
use crate::gauge::{self, Gauges};
use crate::geo::{
    GeoCoord, HorizontalCoord, ScreenPoint, Viewport, geographic_to_horizontal,
    great_circle_deg, horizontal_to_geographic, small_circle, wrap_azimuth, wrap_longitude,
};
use crate::lens::{self, Lens, LensKernel, LensReading};
use crate::sampler::{self, Dimension, Field, Mood, MoodMap};
use crate::snapshot::{ContextSnapshot, RunEvent, RunLog, RunRecord};
use crate::terrain::Terrain;

pub const DEFAULT_SEED: u32 = 42;
pub const DEFAULT_OBSERVER: GeoCoord = GeoCoord::new(0.0, 15.0);
/// Longest simulated step accepted by [`Engine::tick`].
pub const MAX_TICK_SECS: f64 = 0.1;
/// Observer rotation per dragged pixel.
pub const DRAG_DEG_PER_PX: f64 = 0.2;
pub const MAX_OBSERVER_LAT: f64 = 80.0;

/// Everything a renderer needs after one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub temperature: f64,
    pub head: HeadStats,
    pub gauges: Gauges,
    pub lens: LensReading,
    pub director_target: Option<HorizontalCoord>,
    pub lens_moved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Observer { last: ScreenPoint },
    Lens,
}

/// One interactive session.
#[derive(Debug, Clone)]
pub struct Engine {
    config: FieldConfig,
    terrain: Terrain,
    observer: GeoCoord,
    viewport: Viewport,
    frame: Frame,
    seed: u32,
    moods: MoodMap,
    field: Field,
    controller: WeightController,
    lens: Lens,
    director: Director,
    drag: Option<Drag>,
    epoch: u64,
    ticks: u64,
    elapsed_secs: f64,
    run_log: RunLog,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(FieldConfig::default())
    }
}

impl Engine {
    /// Create an engine with [`DEFAULT_SEED`] and generate the first field.
    #[must_use]
    pub fn new(config: FieldConfig) -> Self {
        Self::with_seed(config, DEFAULT_SEED)
    }

    #[must_use]
    pub fn with_seed(config: FieldConfig, seed: u32) -> Self {
        let config = config.sanitized();
        let mut engine = Self {
            terrain: config.terrain(),
            controller: WeightController::new(
                config.pareto_tau,
                config.target_mass,
                config.auto_pareto,
            ),
            config,
            observer: DEFAULT_OBSERVER,
            viewport: Viewport::default(),
            frame: Frame::Planetary,
            seed,
            moods: MoodMap::default(),
            field: Field::empty(),
            lens: Lens::default(),
            director: Director::default(),
            drag: None,
            epoch: 0,
            ticks: 0,
            elapsed_secs: 0.0,
            run_log: RunLog::default(),
        };
        engine.regenerate_field();
        engine
    }

    // ── accessors ────────────────────────────────────────────────────────

    #[must_use]
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    #[must_use]
    pub fn field(&self) -> &Field {
        &self.field
    }

    #[must_use]
    pub fn lens(&self) -> &Lens {
        &self.lens
    }

    #[must_use]
    pub fn director(&self) -> &Director {
        &self.director
    }

    #[must_use]
    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    #[must_use]
    pub fn observer(&self) -> GeoCoord {
        self.observer
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn frame(&self) -> Frame {
        self.frame
    }

    #[must_use]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    #[must_use]
    pub fn moods(&self) -> &MoodMap {
        &self.moods
    }

    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.controller.temperature()
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn run_log(&self) -> &RunLog {
        &self.run_log
    }

    /// `true` while a pointer drag (lens or observer) is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The active frame bound to the current observer, viewport and terrain.
    #[must_use]
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            frame: self.frame,
            observer: self.observer,
            viewport: self.viewport,
            terrain: &self.terrain,
        }
    }

    /// Geographic direction the sampler scatters around.
    #[must_use]
    pub fn focus(&self) -> GeoCoord {
        match self.frame {
            Frame::Planetary => self.lens.geo,
            Frame::Horizontal => horizontal_to_geographic(self.lens.sky, self.observer),
        }
    }

    // ── tick ─────────────────────────────────────────────────────────────

    /// Advance the session by `dt` (clamped to [`MAX_TICK_SECS`]).
    pub fn tick(&mut self, dt: Duration) -> TickReport {
        let dt = dt.as_secs_f64().min(MAX_TICK_SECS);
        self.ticks += 1;
        self.elapsed_secs += dt;

        let stepped = self.controller.step(&mut self.field, dt).is_some();

        let mut lens_moved = false;
        if self.frame == Frame::Horizontal {
            if stepped && self.director.enabled {
                self.director.retarget(&self.field, self.observer);
            }
            lens_moved = self
                .director
                .step(&mut self.lens, dt, self.drag.is_some());
        }

        let view = self.view();
        TickReport {
            tick: self.ticks,
            temperature: self.controller.temperature(),
            head: head_stats(self.field.weights(), self.config.target_mass),
            gauges: gauge::compute(&self.field, &view, self.config.quality_q),
            lens: lens::score(&self.field, &view, &self.lens, self.config.quality_q),
            director_target: self.director.target().map(|t| t.direction),
            lens_moved,
        }
    }

    // ── regeneration and configuration ───────────────────────────────────

    /// Rebuild the point field from the current focus, config, seed and
    /// moods.
    pub fn regenerate_field(&mut self) {
        let span = tracing::debug_span!(
            target: "skylens.sampler",
            "field.regenerate",
            seed = self.seed,
            frame = self.frame.as_str(),
            regenerate_us = tracing::field::Empty,
        );
        let _guard = span.enter();
        let start = Instant::now();

        self.epoch += 1;
        self.field = sampler::generate(
            self.focus(),
            &self.config,
            self.controller.temperature(),
            self.seed,
            &self.moods,
            self.epoch,
        );
        self.refresh_target();

        span.record("regenerate_us", start.elapsed().as_micros() as u64);
    }

    /// Replace the configuration and regenerate.
    pub fn apply_config(&mut self, config: FieldConfig) {
        let config = config.sanitized();
        self.terrain = config.terrain();
        self.controller = WeightController::new(
            config.pareto_tau,
            config.target_mass,
            config.auto_pareto,
        );
        self.config = config;
        self.regenerate_field();
        self.record(RunEvent::ConfigApplied);
    }

    /// Set the softmax temperature directly and reweight in place.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.controller.set_temperature(temperature);
        self.config.pareto_tau = self.controller.temperature();
        self.field.reweight(self.controller.temperature());
        self.refresh_target();
    }

    pub fn set_auto_pareto(&mut self, enabled: bool) {
        self.config.auto_pareto = enabled;
        self.controller.enabled = enabled;
    }

    pub fn set_target_mass(&mut self, target_mass: f64) {
        let target_mass = if target_mass.is_finite() {
            target_mass.clamp(0.5, 0.95)
        } else {
            self.config.target_mass
        };
        self.config.target_mass = target_mass;
        self.controller.target_mass = target_mass;
    }

    /// Advance the seed by the fixed LCG step and regenerate.
    pub fn reseed(&mut self) {
        self.seed = sampler::next_seed(self.seed);
        self.regenerate_field();
        self.record(RunEvent::Reseeded { seed: self.seed });
    }

    /// Jump to an explicit seed and regenerate.
    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
        self.regenerate_field();
    }

    /// Flip one category's mood and regenerate.
    pub fn toggle_mood(&mut self, dimension: Dimension) -> Mood {
        let mood = self.moods.toggle(dimension);
        self.regenerate_field();
        self.record(RunEvent::MoodToggled {
            dimension: dimension.as_str().to_owned(),
        });
        mood
    }

    // ── frame ────────────────────────────────────────────────────────────

    /// Switch frames, carrying the lens focus across, and regenerate.
    pub fn toggle_frame(&mut self) {
        match self.frame {
            Frame::Planetary => {
                let h = geographic_to_horizontal(self.lens.geo, self.observer);
                self.lens.sky = HorizontalCoord::new(h.az, h.alt.max(0.0));
            }
            Frame::Horizontal => {
                self.lens.geo = horizontal_to_geographic(self.lens.sky, self.observer);
            }
        }
        self.frame = self.frame.toggled();
        self.drag = None;
        self.lens.dragging = false;
        self.regenerate_field();
        self.record(RunEvent::FrameToggled { frame: self.frame });
    }

    pub fn set_frame(&mut self, frame: Frame) {
        if frame != self.frame {
            self.toggle_frame();
        }
    }

    // ── lens ─────────────────────────────────────────────────────────────

    pub fn set_lens_radius(&mut self, radius_deg: f64) {
        self.lens.set_radius(radius_deg);
    }

    pub fn set_lens_kernel(&mut self, kernel: LensKernel) {
        if kernel != self.lens.kernel {
            self.lens.kernel = kernel;
            self.record(RunEvent::LensKernelChanged);
        }
    }

    pub fn toggle_lens_kernel(&mut self) {
        self.set_lens_kernel(self.lens.kernel.toggled());
    }

    /// Move the lens focus in the active frame and regenerate around it.
    pub fn set_lens_focus(&mut self, focus: FramePoint) {
        match focus {
            FramePoint::Geo(g) => {
                self.lens.geo = GeoCoord::new(wrap_longitude(g.lon), g.lat.clamp(-90.0, 90.0));
            }
            FramePoint::Sky(h) => {
                self.lens.sky = HorizontalCoord::new(wrap_azimuth(h.az), h.alt.clamp(0.0, 90.0));
            }
        }
        self.regenerate_field();
    }

    /// Lens outline in pixels (visible segments only).
    #[must_use]
    pub fn lens_outline(&self, steps: usize) -> Vec<ScreenPoint> {
        let view = self.view();
        match self.frame {
            Frame::Planetary => small_circle(self.lens.geo, self.lens.radius_deg, steps)
                .into_iter()
                .filter_map(|p| view.project(p))
                .collect(),
            Frame::Horizontal => {
                let centre = GeoCoord::new(self.lens.sky.az, self.lens.sky.alt);
                small_circle(centre, self.lens.radius_deg, steps)
                    .into_iter()
                    .filter_map(|p| view.project_sky(HorizontalCoord::new(wrap_azimuth(p.lon), p.lat)))
                    .collect()
            }
        }
    }

    // ── director ─────────────────────────────────────────────────────────

    pub fn set_director_enabled(&mut self, enabled: bool) {
        self.director.enabled = enabled;
        if enabled {
            self.refresh_target();
        }
    }

    pub fn set_director_speed(&mut self, speed: f64) {
        self.director.set_speed(speed);
    }

    /// Recompute the director target now (horizontal frame only).
    pub fn director_target(&mut self) -> Option<DirectorTarget> {
        self.refresh_target();
        self.director.target()
    }

    fn refresh_target(&mut self) {
        match self.frame {
            Frame::Horizontal => {
                self.director.retarget(&self.field, self.observer);
            }
            Frame::Planetary => self.director.clear_target(),
        }
    }

    // ── locks ────────────────────────────────────────────────────────────

    /// Toggle the lock on `index`; returns the new state. Out-of-range
    /// indices change nothing and are not recorded.
    pub fn toggle_lock(&mut self, index: usize) -> bool {
        if index >= self.field.len() {
            return false;
        }
        let locked = self.field.toggle_lock(index);
        self.refresh_target();
        self.record(RunEvent::LockToggled { index, locked });
        locked
    }

    pub fn clear_locks(&mut self) {
        self.field.clear_locks();
        self.refresh_target();
        self.record(RunEvent::LocksCleared);
    }

    // ── observer and viewport ────────────────────────────────────────────

    /// Rotate the observer by a pixel drag delta.
    pub fn drag_observer(&mut self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        self.set_observer(GeoCoord::new(
            self.observer.lon - dx * DRAG_DEG_PER_PX,
            self.observer.lat + dy * DRAG_DEG_PER_PX,
        ));
    }

    pub fn set_observer(&mut self, observer: GeoCoord) {
        if !(observer.lon.is_finite() && observer.lat.is_finite()) {
            return;
        }
        self.observer = GeoCoord::new(
            wrap_longitude(observer.lon),
            observer.lat.clamp(-MAX_OBSERVER_LAT, MAX_OBSERVER_LAT),
        );
        if self.frame == Frame::Horizontal && self.director.enabled {
            self.director.retarget(&self.field, self.observer);
        }
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Viewport::new(width, height);
    }

    // ── pointer input ────────────────────────────────────────────────────

    /// Start a lens drag if `at` is inside the lens, otherwise an observer
    /// drag. Presses outside the disk are ignored.
    pub fn pointer_down(&mut self, at: ScreenPoint) {
        let Some(hit) = self.view().unproject(at) else {
            return;
        };
        let separation = match hit {
            FramePoint::Geo(g) => great_circle_deg(g, self.lens.geo),
            FramePoint::Sky(h) => h.separation(self.lens.sky),
        };
        if separation <= self.lens.radius_deg {
            self.lens.dragging = true;
            self.drag = Some(Drag::Lens);
        } else {
            self.drag = Some(Drag::Observer { last: at });
        }
    }

    pub fn pointer_move(&mut self, at: ScreenPoint) {
        match self.drag {
            Some(Drag::Observer { last }) => {
                self.drag_observer(at.x - last.x, at.y - last.y);
                self.drag = Some(Drag::Observer { last: at });
            }
            Some(Drag::Lens) => match self.view().unproject(at) {
                Some(FramePoint::Geo(g)) => self.lens.geo = g,
                Some(FramePoint::Sky(h)) => {
                    self.lens.sky = HorizontalCoord::new(h.az, h.alt.clamp(0.0, 90.0));
                }
                None => {}
            },
            None => {}
        }
    }

    /// End any drag. Releasing the lens commits the new focus: the field is
    /// regenerated and the director cools down before resuming.
    pub fn pointer_up(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if drag == Drag::Lens {
            self.lens.dragging = false;
            self.director.begin_cooldown();
            self.regenerate_field();
            self.record(RunEvent::LensReleased);
        }
    }

    /// Toggle the lock of the visible point nearest to `at`. Ignored while
    /// dragging. Returns the toggled index.
    pub fn click(&mut self, at: ScreenPoint) -> Option<usize> {
        if self.drag.is_some() {
            return None;
        }
        let view = self.view();
        let nearest = self
            .field
            .points()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| view.project(p.position).map(|s| (i, s.distance_sq(at))))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(i, _)| i)?;
        self.toggle_lock(nearest);
        Some(nearest)
    }

    // ── context and run log ──────────────────────────────────────────────

    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        let view = self.view();
        ContextSnapshot {
            frame: self.frame,
            observer: self.observer,
            lens: self.lens,
            gauges: gauge::compute(&self.field, &view, self.config.quality_q),
            temperature: self.controller.temperature(),
            head: head_stats(self.field.weights(), self.config.target_mass),
            locked: self.field.locks().iter().copied().collect(),
            point_count: self.field.len(),
            seed: self.seed,
            epoch: self.epoch,
            tick: self.ticks,
            elapsed_secs: self.elapsed_secs,
        }
    }

    /// Mean of the positive normalized lens scores at the current state.
    #[must_use]
    pub fn lens_metric(&self) -> f64 {
        let reading = lens::score(&self.field, &self.view(), &self.lens, self.config.quality_q);
        lens::lens_metric(&reading.scores)
    }

    /// Append a record regardless of `exec_mode`.
    pub fn record_manual(&mut self) -> &RunRecord {
        let context = self.snapshot();
        let metric = self.lens_metric();
        self.run_log.push(RunEvent::Manual, context, metric)
    }

    fn record(&mut self, event: RunEvent) {
        if self.config.exec_mode != ExecMode::Auto {
            return;
        }
        let context = self.snapshot();
        let metric = self.lens_metric();
        self.run_log.push(event, context, metric);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::Subscriber;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    use super::*;

    fn small() -> FieldConfig {
        FieldConfig {
            art_points: 120,
            ..FieldConfig::default()
        }
    }

    #[test]
    fn new_engine_has_a_field() {
        let e = Engine::new(small());
        assert_eq!(e.field().len(), 120);
        assert_eq!(e.field().locks().len(), 8);
        assert_eq!(e.seed(), DEFAULT_SEED);
    }

    #[test]
    fn tick_clamps_dt() {
        let mut e = Engine::new(small());
        e.tick(Duration::from_secs(5));
        let s = e.snapshot();
        assert!((s.elapsed_secs - MAX_TICK_SECS).abs() < 1e-12);
        assert_eq!(s.tick, 1);
    }

    #[test]
    fn reseed_follows_lcg() {
        let mut e = Engine::new(small());
        let before = e.field().clone();
        e.reseed();
        assert_eq!(e.seed(), sampler::next_seed(DEFAULT_SEED));
        assert_ne!(e.field().points(), before.points());
        assert_eq!(e.field().epoch(), before.epoch() + 1);
    }

    #[test]
    fn frame_toggle_carries_lens_focus() {
        let mut e = Engine::new(small());
        e.set_lens_focus(FramePoint::Geo(GeoCoord::new(10.0, 20.0)));
        e.toggle_frame();
        assert_eq!(e.frame(), Frame::Horizontal);
        let expected = geographic_to_horizontal(GeoCoord::new(10.0, 20.0), e.observer());
        assert!((e.lens().sky.az - expected.az).abs() < 1e-9);
        e.toggle_frame();
        assert!(great_circle_deg(e.lens().geo, GeoCoord::new(10.0, 20.0)) < 1e-6);
    }

    #[test]
    fn observer_drag_clamps_latitude() {
        let mut e = Engine::new(small());
        e.drag_observer(0.0, 10_000.0);
        assert_eq!(e.observer().lat, MAX_OBSERVER_LAT);
        e.drag_observer(100.0, 0.0);
        assert!((e.observer().lon - (-20.0)).abs() < 1e-9);
    }

    #[test]
    fn pointer_on_lens_drags_lens_and_release_regenerates() {
        let mut e = Engine::new(small());
        let centre = e.view().lens_center(e.lens()).unwrap();
        let epoch = e.field().epoch();
        e.pointer_down(centre);
        assert!(e.lens().dragging);
        e.pointer_move(ScreenPoint::new(centre.x + 20.0, centre.y));
        assert!(e.lens().geo.lon > 0.0);
        assert_eq!(e.field().epoch(), epoch);
        e.pointer_up();
        assert!(!e.lens().dragging);
        assert_eq!(e.field().epoch(), epoch + 1);
        assert_eq!(e.director().cooldown(), crate::director::COOLDOWN_SECS);
    }

    #[test]
    fn dragged_lens_lands_under_the_cursor() {
        let mut e = Engine::new(small());
        let target = GeoCoord::new(30.0, 25.0);
        let centre = e.view().lens_center(e.lens()).unwrap();
        let at = e.view().project(target).unwrap();
        e.pointer_down(centre);
        e.pointer_move(at);
        assert!(great_circle_deg(e.lens().geo, target) < 1e-3);
        e.pointer_up();
        assert!(great_circle_deg(e.lens().geo, target) < 1e-3);
    }

    #[test]
    fn out_of_range_lock_toggle_is_not_recorded() {
        let mut e = Engine::new(small());
        let records = e.run_log().len();
        let locks = e.field().locks().clone();
        assert!(!e.toggle_lock(120));
        assert_eq!(e.run_log().len(), records);
        assert_eq!(e.field().locks(), &locks);
        e.toggle_lock(119);
        assert_eq!(e.run_log().len(), records + 1);
    }

    #[test]
    fn pointer_off_lens_drags_observer() {
        let mut e = Engine::new(small());
        let vp = e.viewport();
        let start = ScreenPoint::new(vp.center().x, vp.center().y - vp.radius() * 0.8);
        e.pointer_down(start);
        assert!(e.is_dragging() && !e.lens().dragging);
        e.pointer_move(ScreenPoint::new(start.x + 10.0, start.y));
        assert!((e.observer().lon - (-2.0)).abs() < 1e-9);
        e.pointer_up();
        assert!(!e.is_dragging());
    }

    #[test]
    fn click_toggles_nearest_visible_point() {
        let mut e = Engine::new(small());
        e.clear_locks();
        let view = e.view();
        let (target, at) = e
            .field()
            .points()
            .iter()
            .enumerate()
            .find_map(|(i, p)| view.project(p.position).map(|s| (i, s)))
            .unwrap();
        // Ties on distance go to the lower index, so the first visible
        // point wins even if another shares its pixel.
        assert_eq!(e.click(at), Some(target));
        assert!(e.field().is_locked(target));
        assert_eq!(e.click(at), Some(target));
        assert!(!e.field().is_locked(target));
    }

    #[test]
    fn auto_exec_records_discrete_events() {
        let mut e = Engine::new(small());
        e.reseed();
        e.clear_locks();
        e.toggle_lens_kernel();
        assert_eq!(e.run_log().len(), 3);
        let last = e.run_log().latest().unwrap();
        assert_eq!(last.event, RunEvent::LensKernelChanged);

        let mut manual = Engine::new(FieldConfig {
            exec_mode: ExecMode::Manual,
            ..small()
        });
        manual.reseed();
        assert!(manual.run_log().is_empty());
        manual.record_manual();
        assert_eq!(manual.run_log().len(), 1);
    }

    #[test]
    fn lens_outline_surrounds_focus() {
        let e = Engine::new(small());
        let outline = e.lens_outline(36);
        assert_eq!(outline.len(), 37);
    }

    #[derive(Default)]
    struct RegenTraceState {
        saw_span: bool,
        saw_duration: bool,
    }

    struct RegenTraceCapture {
        state: Arc<Mutex<RegenTraceState>>,
    }

    impl<S> Layer<S> for RegenTraceCapture
    where
        S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::Id,
            _ctx: Context<'_, S>,
        ) {
            if attrs.metadata().name() == "field.regenerate" {
                self.state.lock().expect("trace lock").saw_span = true;
            }
        }

        fn on_record(
            &self,
            id: &tracing::Id,
            values: &tracing::span::Record<'_>,
            ctx: Context<'_, S>,
        ) {
            let Some(span) = ctx.span(id) else {
                return;
            };
            if span.metadata().name() != "field.regenerate" {
                return;
            }
            struct V {
                saw: bool,
            }
            impl tracing::field::Visit for V {
                fn record_u64(&mut self, field: &tracing::field::Field, _value: u64) {
                    if field.name() == "regenerate_us" {
                        self.saw = true;
                    }
                }

                fn record_debug(
                    &mut self,
                    _field: &tracing::field::Field,
                    _value: &dyn std::fmt::Debug,
                ) {
                }
            }
            let mut v = V { saw: false };
            values.record(&mut v);
            if v.saw {
                self.state.lock().expect("trace lock").saw_duration = true;
            }
        }
    }

    #[test]
    fn regeneration_emits_span_with_duration() {
        let state = Arc::new(Mutex::new(RegenTraceState::default()));
        let subscriber = tracing_subscriber::registry().with(RegenTraceCapture {
            state: Arc::clone(&state),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let _engine = Engine::new(small());

        let snapshot = state.lock().expect("trace lock");
        assert!(snapshot.saw_span, "expected field.regenerate span");
        assert!(snapshot.saw_duration, "expected regenerate_us record");
    }
}
