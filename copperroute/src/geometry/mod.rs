//! Geometry Kernel
//!
//! Integer polygon geometry used by obstacle collection and path validation.
//! All coordinates are nanometres stored as `i64`; products are widened to
//! `i128` so repeated boolean tests never drift.
//!
//! Every [`PolygonSet`] holds convex, counter-clockwise pieces. Non-convex
//! outlines are decomposed on the way in, which keeps `offset` and
//! `intersects` simple: both distribute over the union of pieces.

mod clip;
mod decompose;
mod hull;
mod offset;
mod path;
mod shape;

pub use clip::{convex_overlap, intersects};
pub use decompose::decompose;
pub use hull::convex_hull;
pub use offset::{circle, offset};
pub use path::{capsule, to_polygon};
pub use shape::Shape;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Board length unit (nanometres).
pub type Nm = i64;

pub const NM_PER_MM: Nm = 1_000_000;

/// Convert millimetres to nanometres, rounding to the nearest unit.
pub fn mm(value: f64) -> Nm {
    (value * NM_PER_MM as f64).round() as Nm
}

/// Convert nanometres to millimetres for display.
pub fn to_mm(value: Nm) -> f64 {
    value as f64 / NM_PER_MM as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: Nm,
    pub y: Nm,
}

impl Coord {
    pub const fn new(x: Nm, y: Nm) -> Self {
        Self { x, y }
    }

    pub fn from_mm(x: f64, y: f64) -> Self {
        Self::new(mm(x), mm(y))
    }

    pub fn dot(self, other: Coord) -> i128 {
        self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128
    }

    /// Z component of `self × other`.
    pub fn cross(self, other: Coord) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }

    pub fn dist_sq(self, other: Coord) -> i128 {
        let d = other - self;
        d.dot(d)
    }

    pub fn distance(self, other: Coord) -> f64 {
        (self.dist_sq(other) as f64).sqrt()
    }

    /// Rotate around the origin by `degrees`, counter-clockwise in a y-up frame.
    pub fn rotated(self, degrees: f64) -> Coord {
        if degrees == 0.0 {
            return self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        let x = self.x as f64;
        let y = self.y as f64;
        Coord::new(
            (x * cos - y * sin).round() as Nm,
            (x * sin + y * cos).round() as Nm,
        )
    }
}

impl Add for Coord {
    type Output = Coord;
    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord {
    type Output = Coord;
    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Coord {
    type Output = Coord;
    fn neg(self) -> Coord {
        Coord::new(-self.x, -self.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", to_mm(self.x), to_mm(self.y))
    }
}

/// Orientation of `c` relative to the directed line `a → b` (positive = left turn).
pub fn orient(a: Coord, b: Coord, c: Coord) -> i128 {
    (b - a).cross(c - a)
}

/// Axis-aligned bounding box, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub min: Coord,
    pub max: Coord,
}

impl BBox {
    pub fn from_points(points: &[Coord]) -> Option<BBox> {
        let first = *points.first()?;
        let mut bbox = BBox { min: first, max: first };
        for p in &points[1..] {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    pub fn union(self, other: BBox) -> BBox {
        BBox {
            min: Coord::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Coord::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// True when the interiors of both boxes overlap.
    pub fn overlaps(&self, other: &BBox) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn contains(&self, p: Coord) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Closed polygon; the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Coord>,
}

impl Polygon {
    pub fn new(points: Vec<Coord>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle centred on `center`.
    pub fn rect(center: Coord, width: Nm, height: Nm) -> Self {
        let hw = width / 2;
        let hh = height / 2;
        Self::new(vec![
            Coord::new(center.x - hw, center.y - hh),
            Coord::new(center.x + hw, center.y - hh),
            Coord::new(center.x + hw, center.y + hh),
            Coord::new(center.x - hw, center.y + hh),
        ])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Twice the signed area (positive for counter-clockwise winding).
    pub fn signed_area2(&self) -> i128 {
        let n = self.points.len();
        if n < 3 {
            return 0;
        }
        (0..n)
            .map(|i| self.points[i].cross(self.points[(i + 1) % n]))
            .sum()
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.points)
    }

    /// Same outline with counter-clockwise winding.
    pub fn into_ccw(mut self) -> Self {
        if self.signed_area2() < 0 {
            self.points.reverse();
        }
        self
    }

    /// Drop repeated and collinear vertices.
    pub fn simplified(&self) -> Polygon {
        let mut pts: Vec<Coord> = Vec::with_capacity(self.points.len());
        for &p in &self.points {
            if pts.last() != Some(&p) {
                pts.push(p);
            }
        }
        while pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }

        let mut changed = true;
        while changed && pts.len() >= 3 {
            changed = false;
            let n = pts.len();
            for i in 0..n {
                let prev = pts[(i + n - 1) % n];
                let next = pts[(i + 1) % n];
                if orient(prev, pts[i], next) == 0 {
                    pts.remove(i);
                    changed = true;
                    break;
                }
            }
        }
        Polygon::new(pts)
    }

    pub fn is_convex(&self) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut sign = 0i128;
        for i in 0..n {
            let o = orient(self.points[i], self.points[(i + 1) % n], self.points[(i + 2) % n]);
            if o != 0 {
                if sign == 0 {
                    sign = o.signum();
                } else if o.signum() != sign {
                    return false;
                }
            }
        }
        sign != 0
    }

    /// Point containment for convex CCW polygons, boundary inclusive.
    pub fn contains_convex(&self, p: Coord) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        (0..n).all(|i| orient(self.points[i], self.points[(i + 1) % n], p) >= 0)
    }

    pub fn translated(&self, by: Coord) -> Polygon {
        Polygon::new(self.points.iter().map(|&p| p + by).collect())
    }
}

/// Union of convex, counter-clockwise polygon pieces.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolygonSet {
    pieces: Vec<Polygon>,
}

impl PolygonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decompose an arbitrary simple polygon into convex pieces.
    pub fn from_polygon(polygon: &Polygon) -> Self {
        Self {
            pieces: decompose(polygon),
        }
    }

    /// Wrap a polygon already known to be convex.
    pub fn from_convex(polygon: Polygon) -> Self {
        let mut set = Self::new();
        set.push_convex(polygon);
        set
    }

    pub fn push_convex(&mut self, polygon: Polygon) {
        let polygon = polygon.simplified().into_ccw();
        if polygon.len() >= 3 {
            self.pieces.push(polygon);
        }
    }

    pub fn extend(&mut self, other: PolygonSet) {
        self.pieces.extend(other.pieces);
    }

    pub fn pieces(&self) -> &[Polygon] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.pieces.iter().map(Polygon::len).sum()
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.pieces
            .iter()
            .filter_map(Polygon::bbox)
            .reduce(BBox::union)
    }

    pub fn contains(&self, p: Coord) -> bool {
        self.pieces.iter().any(|piece| piece.contains_convex(p))
    }
}

/// Resolution knobs shared by every kernel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelOptions {
    /// Segments used to approximate a full circle.
    pub arc_segments: usize,
    /// Upper bound on the vertex count of a single offset piece.
    pub max_vertices: usize,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            arc_segments: 16,
            max_vertices: 64,
        }
    }
}
