#![forbid(unsafe_code)]

//! Adaptive spherical field engine.
//!
//! A heavy-tailed point field is scattered over a sphere around a focus
//! direction and weighted by a temperature-controlled softmax. The field can
//! be viewed on the planet (orthographic globe) or in an observer's sky
//! (zenith-centred polar projection) and is queried through an angular lens.
//!
//! # Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`geo`] | coordinates, frame conversion, projections |
//! | [`terrain`] | seeded fBm relief and illumination |
//! | [`sampler`] | point generation, salience, softmax weights, locks |
//! | [`controller`] | proportional temperature controller |
//! | [`gauge`] | pairwise kernel gauges |
//! | [`lens`] | angular lens scoring |
//! | [`director`] | weighted spherical-mean steering |
//! | [`frame`] | the active frame bound to observer and viewport |
//! | [`engine`] | session context driving all of the above |
//! | [`config`], [`error`] | configuration loading and its errors |
//! | [`snapshot`] | serializable context and run log |
//!
//! # Example
//!
//! ```
//! use skylens_core::{Engine, FieldConfig};
//! use web_time::Duration;
//!
//! let mut engine = Engine::new(FieldConfig::default());
//! let report = engine.tick(Duration::from_millis(16));
//! assert_eq!(engine.field().len(), 900);
//! assert!(report.gauges.g < 1.0);
//! ```

pub mod config;
pub mod controller;
pub mod director;
pub mod engine;
pub mod error;
pub mod frame;
pub mod gauge;
pub mod geo;
pub mod lens;
pub mod sampler;
pub mod snapshot;
pub mod terrain;

pub use config::{ExecMode, FieldConfig, IntentAxis};
pub use controller::{HeadStats, WeightController, head_stats};
pub use director::{Director, DirectorTarget};
pub use engine::{Engine, TickReport};
pub use error::{ConfigError, Result};
pub use frame::{Frame, FramePoint, FrameView};
pub use gauge::Gauges;
pub use geo::{GeoCoord, HorizontalCoord, PlanePoint, ScreenPoint, Viewport};
pub use lens::{Lens, LensKernel, LensReading};
pub use sampler::{Dimension, Field, Mood, MoodMap, SamplePoint};
pub use snapshot::{ContextSnapshot, RunEvent, RunLog, RunRecord};
pub use terrain::{Planet, Terrain};
