//! `wasm-bindgen` exports for the FieldRunner.

use js_sys::{Float32Array, Object, Reflect};
use wasm_bindgen::prelude::*;

use crate::field_model::FieldModel;
use skylens_core::{Frame, LensKernel};

fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn install_panic_hook() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let global = js_sys::global();
            if let Ok(console) = Reflect::get(&global, &"console".into()) {
                if let Ok(error) = Reflect::get(&console, &"error".into()) {
                    if let Ok(f) = error.dyn_into::<js_sys::Function>() {
                        let _ = f.call1(&console, &JsValue::from_str(&format!("{info}")));
                    }
                }
            }
        }));
    });
}

/// Field engine runner.
///
/// Host-driven: JavaScript owns `requestAnimationFrame`, forwards pointer
/// events in canvas pixels and advances time once per frame.
#[wasm_bindgen]
pub struct FieldRunner {
    inner: FieldModel,
}

#[wasm_bindgen]
impl FieldRunner {
    /// Create a runner with the default config for a canvas of the given
    /// pixel size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        install_panic_hook();
        let mut inner = FieldModel::default();
        inner.resize(width, height);
        Self { inner }
    }

    /// Replace the config from a JSON object string. Returns `false` (and
    /// keeps the current state) if the JSON does not parse.
    #[wasm_bindgen(js_name = loadConfig)]
    pub fn load_config(&mut self, json: &str) -> bool {
        self.inner.load_config_json(json).is_ok()
    }

    /// Advance the simulation by `dt_ms` milliseconds.
    #[wasm_bindgen(js_name = advanceTime)]
    pub fn advance_time(&mut self, dt_ms: f64) -> JsValue {
        let obj = Object::new();
        match self.inner.advance(dt_ms) {
            Some(report) => {
                set_js(&obj, "advanced", JsValue::from(true));
                set_js(&obj, "tick", JsValue::from(report.tick as f64));
                set_js(&obj, "temperature", JsValue::from(report.temperature));
                set_js(&obj, "gaugeG", JsValue::from(report.gauges.g));
                set_js(&obj, "gaugeV", JsValue::from(report.gauges.v));
                set_js(&obj, "headK", JsValue::from(report.head.k as u32));
                set_js(&obj, "headFraction", JsValue::from(report.head.head_fraction));
                set_js(&obj, "lensIntensity", JsValue::from(report.lens.intensity));
                set_js(&obj, "lensMoved", JsValue::from(report.lens_moved));
                if let Some(t) = report.director_target {
                    set_js(&obj, "targetAz", JsValue::from(t.az));
                    set_js(&obj, "targetAlt", JsValue::from(t.alt));
                }
            }
            None => set_js(&obj, "advanced", JsValue::from(false)),
        }
        obj.into()
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.inner.resize(width, height);
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.inner.pointer_down(x, y);
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.inner.pointer_move(x, y);
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) {
        self.inner.pointer_up();
    }

    /// Toggle the lock of the nearest visible point; returns its index or -1.
    pub fn click(&mut self, x: f64, y: f64) -> f64 {
        self.inner.click(x, y) as f64
    }

    #[wasm_bindgen(js_name = toggleFrame)]
    pub fn toggle_frame(&mut self) -> String {
        self.inner.engine_mut().toggle_frame();
        self.inner.engine().frame().as_str().to_owned()
    }

    #[wasm_bindgen(js_name = isSky)]
    pub fn is_sky(&self) -> bool {
        self.inner.engine().frame() == Frame::Horizontal
    }

    #[wasm_bindgen(js_name = toggleLensKernel)]
    pub fn toggle_lens_kernel(&mut self) -> String {
        self.inner.engine_mut().toggle_lens_kernel();
        self.inner.engine().lens().kernel.as_str().to_owned()
    }

    #[wasm_bindgen(js_name = setLensKernel)]
    pub fn set_lens_kernel(&mut self, name: &str) {
        self.inner.engine_mut().set_lens_kernel(LensKernel::parse(name));
    }

    #[wasm_bindgen(js_name = setLensRadius)]
    pub fn set_lens_radius(&mut self, degrees: f64) {
        self.inner.engine_mut().set_lens_radius(degrees);
    }

    #[wasm_bindgen(js_name = setTemperature)]
    pub fn set_temperature(&mut self, tau: f64) {
        self.inner.engine_mut().set_temperature(tau);
    }

    #[wasm_bindgen(js_name = setAutoPareto)]
    pub fn set_auto_pareto(&mut self, enabled: bool) {
        self.inner.engine_mut().set_auto_pareto(enabled);
    }

    #[wasm_bindgen(js_name = setDirector)]
    pub fn set_director(&mut self, enabled: bool, speed: f64) {
        let engine = self.inner.engine_mut();
        engine.set_director_speed(speed);
        engine.set_director_enabled(enabled);
    }

    pub fn reseed(&mut self) -> u32 {
        self.inner.engine_mut().reseed();
        self.inner.engine().seed()
    }

    #[wasm_bindgen(js_name = clearLocks)]
    pub fn clear_locks(&mut self) {
        self.inner.engine_mut().clear_locks();
    }

    /// Flip a category's mood by name; returns `"positive"`, `"negative"`
    /// or an empty string for an unknown name.
    #[wasm_bindgen(js_name = toggleMood)]
    pub fn toggle_mood(&mut self, name: &str) -> String {
        self.inner
            .toggle_mood(name)
            .map(|m| match m {
                skylens_core::Mood::Positive => "positive".to_owned(),
                skylens_core::Mood::Negative => "negative".to_owned(),
            })
            .unwrap_or_default()
    }

    /// Projected points as `Float32Array` of `[x, y, r, g, b, size, locked]`.
    #[wasm_bindgen(js_name = projectPoints)]
    pub fn project_points(&self) -> Float32Array {
        Float32Array::from(&self.inner.project_to_buffer()[..])
    }

    /// Terrain shading samples as `Float32Array` of `[x, y, r, g, b]`.
    #[wasm_bindgen(js_name = shadeTerrain)]
    pub fn shade_terrain(&self) -> Float32Array {
        Float32Array::from(&self.inner.shade_to_buffer()[..])
    }

    /// Lens boundary as `Float32Array` of `[x, y]`.
    #[wasm_bindgen(js_name = lensOutline)]
    pub fn lens_outline(&self) -> Float32Array {
        Float32Array::from(&self.inner.lens_outline_buffer()[..])
    }

    #[wasm_bindgen(js_name = stateInfo)]
    pub fn state_info(&self) -> String {
        self.inner.state_info()
    }

    /// Current context as a JSON string (`"{}"` if encoding fails).
    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> String {
        self.inner.snapshot_json().unwrap_or_else(|_| String::from("{}"))
    }

    /// Recorded run log as a JSON array string.
    #[wasm_bindgen(js_name = runLogJson)]
    pub fn run_log_json(&self) -> String {
        let records: Vec<_> = self.inner.engine().run_log().iter().collect();
        serde_json::to_string(&records).unwrap_or_else(|_| String::from("[]"))
    }
}
