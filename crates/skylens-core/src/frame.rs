#![forbid(unsafe_code)]

//! The active viewing frame, bound once per tick.
//!
//! [`FrameView`] pairs a [`Frame`] with the observer, viewport and terrain so
//! callers can project, hit-test and measure lens distances without
//! branching on the frame themselves.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geo::{
    GeoCoord, HorizontalCoord, PlanePoint, SKY_DISK_SCALE, ScreenPoint, Viewport,
    geographic_to_horizontal, great_circle_deg, project_horizontal, project_orthographic,
    unproject_horizontal, unproject_orthographic,
};
use crate::lens::Lens;
use crate::terrain::Terrain;

/// Upper bound on fixed-point steps when inverting the terrain relief.
const RELIEF_ITERATIONS: usize = 24;
/// Relief inversion stops once a step moves less than this, in degrees.
const RELIEF_TOLERANCE_DEG: f64 = 1e-9;

/// Which sphere the field is shown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frame {
    /// Orthographic globe centred on the observer sub-point.
    #[default]
    Planetary,
    /// The observer's sky, zenith at the centre.
    Horizontal,
}

impl Frame {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Planetary => Self::Horizontal,
            Self::Horizontal => Self::Planetary,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planetary => "planetary",
            Self::Horizontal => "horizontal",
        }
    }

    /// Accepts `planetary`/`planet` and `horizontal`/`sky`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "planetary" | "planet" => Some(Self::Planetary),
            "horizontal" | "sky" => Some(Self::Horizontal),
            _ => None,
        }
    }

    /// Fraction of the viewport radius this frame's disk covers.
    #[must_use]
    pub fn disk_scale(self) -> f64 {
        match self {
            Self::Planetary => 1.0,
            Self::Horizontal => SKY_DISK_SCALE,
        }
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Self::parse(&raw).unwrap_or_default())
    }
}

/// A hit-tested position in the active frame's native coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FramePoint {
    Geo(GeoCoord),
    Sky(HorizontalCoord),
}

/// A frame bound to the state it needs for projection.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub frame: Frame,
    pub observer: GeoCoord,
    pub viewport: Viewport,
    pub terrain: &'a Terrain,
}

impl FrameView<'_> {
    /// Plane coordinates of a geographic point, `None` if hidden.
    #[must_use]
    pub fn to_plane(&self, p: GeoCoord) -> Option<PlanePoint> {
        let (plane, visible) = match self.frame {
            Frame::Planetary => project_orthographic(p, self.observer, self.terrain.elevation(p)),
            Frame::Horizontal => project_horizontal(geographic_to_horizontal(p, self.observer)),
        };
        visible.then_some(plane)
    }

    /// Pixel position of a geographic point, `None` if hidden.
    #[must_use]
    pub fn project(&self, p: GeoCoord) -> Option<ScreenPoint> {
        self.to_plane(p)
            .map(|plane| self.viewport.to_screen(plane, self.frame.disk_scale()))
    }

    /// Pixel position of a sky direction, `None` below the horizon.
    #[must_use]
    pub fn project_sky(&self, h: HorizontalCoord) -> Option<ScreenPoint> {
        let (plane, visible) = project_horizontal(h);
        visible.then(|| self.viewport.to_screen(plane, SKY_DISK_SCALE))
    }

    /// Inverse of [`FrameView::project`]; `None` outside the disk.
    ///
    /// On the globe the relief is inverted as well, so a projected point
    /// unprojects back to itself rather than to the flat sphere beneath it.
    #[must_use]
    pub fn unproject(&self, s: ScreenPoint) -> Option<FramePoint> {
        let plane = self.viewport.to_plane(s, self.frame.disk_scale());
        match self.frame {
            Frame::Planetary => self.unproject_relief(plane).map(FramePoint::Geo),
            Frame::Horizontal => unproject_horizontal(plane).map(FramePoint::Sky),
        }
    }

    /// Solve `plane = project(g)` for `g` by fixed-point iteration on the
    /// radius `1 + elevation(g)`, starting from the flat sphere.
    fn unproject_relief(&self, plane: PlanePoint) -> Option<GeoCoord> {
        let rho = plane.radius();
        if !rho.is_finite() {
            return None;
        }
        let shrink = |r: f64| PlanePoint::new(plane.x / r, plane.y / r);
        let mut guess = unproject_orthographic(shrink(rho.max(1.0)), self.observer)?;
        for _ in 0..RELIEF_ITERATIONS {
            let r = 1.0 + self.terrain.elevation(guess);
            if r <= 0.0 {
                return None;
            }
            let next = unproject_orthographic(shrink(r), self.observer)?;
            let moved = great_circle_deg(guess, next);
            guess = next;
            if moved < RELIEF_TOLERANCE_DEG {
                break;
            }
        }
        Some(guess)
    }

    /// Pixel position of the lens focus in this frame.
    #[must_use]
    pub fn lens_center(&self, lens: &Lens) -> Option<ScreenPoint> {
        match self.frame {
            Frame::Planetary => self.project(lens.geo),
            Frame::Horizontal => self.project_sky(lens.sky),
        }
    }

    /// Angular distance from the lens focus to `p` in this frame. In the
    /// horizontal frame points below the horizon have no distance.
    #[must_use]
    pub fn lens_separation(&self, lens: &Lens, p: GeoCoord) -> Option<f64> {
        match self.frame {
            Frame::Planetary => Some(great_circle_deg(lens.geo, p)),
            Frame::Horizontal => {
                let h = geographic_to_horizontal(p, self.observer);
                (h.alt >= 0.0).then(|| lens.sky.separation(h))
            }
        }
    }
}
