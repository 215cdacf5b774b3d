//! Canvas geometry primitives.
//!
//! Schematic positions live on a fixed 20-unit grid. All connectivity
//! inference is spatial, so the only operations needed here are distance
//! predicates and the rotation of terminal offsets around a component
//! anchor.

use serde::{Deserialize, Serialize};

/// Spacing of the schematic grid in canvas units.
pub const GRID: f64 = 20.0;

/// A point on the schematic canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_sq(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(&self, other: Point) -> f64 {
        self.distance_sq(other).sqrt()
    }
}

/// Component rotation, restricted to quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Rotation angle in degrees.
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Parse a degree value; only quarter turns are representable.
    pub fn from_degrees(deg: i64) -> Option<Self> {
        match deg.rem_euclid(360) {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }

    /// Rotate an offset `(dx, dy)` around the origin. Canvas y grows
    /// downward, so a quarter turn maps `(dx, dy)` to `(-dy, dx)`.
    pub fn apply(self, dx: f64, dy: f64) -> (f64, f64) {
        match self {
            Rotation::R0 => (dx, dy),
            Rotation::R90 => (-dy, dx),
            Rotation::R180 => (-dx, -dy),
            Rotation::R270 => (dy, -dx),
        }
    }
}

/// Distance from point `p` to the segment `a`–`b`.
///
/// Degenerate segments (zero length) collapse to point distance.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let len_sq = a.distance_sq(b);
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len_sq;
    let t = t.clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
    p.distance(proj)
}
