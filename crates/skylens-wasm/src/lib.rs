#![forbid(unsafe_code)]

//! Browser front end for the skylens field engine.
//!
//! The page owns the animation loop: every frame it advances time, forwards
//! pointer input, and pulls flat `Float32Array` buffers to draw on a 2D
//! canvas. All state lives in [`field_model::FieldModel`], which builds and
//! tests natively.

pub mod field_model;

#[cfg(target_arch = "wasm32")]
mod wasm;
