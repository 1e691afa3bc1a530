//! Paths made of line and circular-arc segments.
//!
//! A path is a sequence of [`PathVertex`]; each vertex carries the kind of
//! the segment that leaves it towards the next vertex. Arc segments store a
//! signed radius: positive for a sweep up to half a turn, negative for a
//! longer sweep, so that start point, end point, radius and direction fully
//! determine the arc.
//!
//! All arc primitives work on unscaled (mm) coordinates.

use super::{Point, PointF};
use crate::{unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Direction of an arc (clockwise or counter-clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArcDirection {
    /// Clockwise arc (G2)
    Clockwise,
    /// Counter-clockwise arc (G3)
    CounterClockwise,
}

impl ArcDirection {
    /// Returns the G-code command for this direction.
    pub fn gcode_command(&self) -> &'static str {
        match self {
            ArcDirection::Clockwise => "G2",
            ArcDirection::CounterClockwise => "G3",
        }
    }

    /// True for counter-clockwise arcs.
    #[inline]
    pub fn is_ccw(&self) -> bool {
        matches!(self, ArcDirection::CounterClockwise)
    }

    /// The direction of the same arc traversed backwards.
    #[inline]
    pub fn reversed(&self) -> Self {
        match self {
            ArcDirection::Clockwise => ArcDirection::CounterClockwise,
            ArcDirection::CounterClockwise => ArcDirection::Clockwise,
        }
    }
}

/// Kind of the segment leaving a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Straight line to the next vertex.
    #[default]
    Linear,
    /// Circular arc to the next vertex.
    Arc {
        /// Signed radius in scaled units (negative when the sweep exceeds PI).
        radius: Coord,
        direction: ArcDirection,
    },
}

impl SegmentKind {
    /// The same segment traversed backwards.
    pub fn reversed(&self) -> Self {
        match *self {
            SegmentKind::Linear => SegmentKind::Linear,
            SegmentKind::Arc { radius, direction } => SegmentKind::Arc {
                radius,
                direction: direction.reversed(),
            },
        }
    }
}

/// A path vertex: a point plus the kind of the segment to the next vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathVertex {
    pub point: Point,
    #[serde(default)]
    pub kind: SegmentKind,
}

impl PathVertex {
    /// Vertex followed by a straight segment (or ending the path).
    #[inline]
    pub const fn linear(point: Point) -> Self {
        Self {
            point,
            kind: SegmentKind::Linear,
        }
    }

    /// Vertex followed by an arc segment.
    #[inline]
    pub const fn arc(point: Point, radius: Coord, direction: ArcDirection) -> Self {
        Self {
            point,
            kind: SegmentKind::Arc { radius, direction },
        }
    }

    #[inline]
    pub fn is_linear(&self) -> bool {
        matches!(self.kind, SegmentKind::Linear)
    }
}

/// Center of the arc from `start` to `end` with a signed `radius`.
///
/// If the endpoints are (nearly) antipodal the discriminant can turn slightly
/// negative; the chord midpoint is returned then. A zero-length chord returns
/// `start`.
pub fn arc_center(start: PointF, end: PointF, radius: CoordF, ccw: bool) -> PointF {
    let v = end - start;
    let q2 = v.length_squared();
    if q2 == 0.0 {
        return start;
    }
    let t2 = radius * radius / q2 - 0.25;
    let t = if t2 > 0.0 { t2.sqrt() } else { 0.0 };
    let mid = (start + end) * 0.5;
    let vp = PointF::new(-v.y * t, v.x * t);
    if (radius > 0.0) == ccw {
        mid + vp
    } else {
        mid - vp
    }
}

/// Sweep angle (always positive) of the arc from `start` to `end` with a signed `radius`.
pub fn arc_angle(start: PointF, end: PointF, radius: CoordF) -> CoordF {
    let r = radius.abs();
    if r == 0.0 {
        return 0.0;
    }
    let d = (start.distance(&end) / (2.0 * r)).min(1.0);
    let a = 2.0 * d.asin();
    if radius > 0.0 {
        a
    } else {
        2.0 * PI - a
    }
}

/// Length of the arc from `start` to `end` with a signed `radius`.
#[inline]
pub fn arc_length(start: PointF, end: PointF, radius: CoordF) -> CoordF {
    radius.abs() * arc_angle(start, end, radius)
}

/// Length (mm) of the segment leaving `from` and ending at `to`.
pub fn segment_length(from: &PathVertex, to: Point) -> CoordF {
    let (a, b) = (from.point.to_f64(), to.to_f64());
    match from.kind {
        SegmentKind::Linear => a.distance(&b),
        SegmentKind::Arc { radius, .. } => arc_length(a, b, unscale(radius)),
    }
}

/// Length (mm) of a whole path.
pub fn estimate_path_length(path: &[PathVertex]) -> CoordF {
    path.windows(2)
        .map(|w| segment_length(&w[0], w[1].point))
        .sum()
}

/// Reverse a path in place, keeping every segment's geometry.
pub fn reverse_path(path: &mut [PathVertex]) {
    let n = path.len();
    if n < 2 {
        return;
    }
    for i in (1..n).rev() {
        path[i].kind = path[i - 1].kind.reversed();
    }
    path[0].kind = SegmentKind::Linear;
    path.reverse();
}

/// An open path of line and arc segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcPolyline {
    vertices: Vec<PathVertex>,
}

impl ArcPolyline {
    /// Create a new empty path.
    #[inline]
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
        }
    }

    /// Create a path of straight segments through `points`.
    pub fn from_points(points: &[Point]) -> Self {
        Self {
            vertices: points.iter().copied().map(PathVertex::linear).collect(),
        }
    }

    /// Append a straight segment ending at `point`.
    pub fn push_line(&mut self, point: Point) {
        self.vertices.push(PathVertex::linear(point));
    }

    /// Append an arc segment ending at `point`.
    ///
    /// The arc parameters are stored on the current last vertex. On an empty
    /// path this only records the start point.
    pub fn push_arc(&mut self, point: Point, radius: Coord, direction: ArcDirection) {
        if let Some(last) = self.vertices.last_mut() {
            last.kind = SegmentKind::Arc { radius, direction };
        }
        self.vertices.push(PathVertex::linear(point));
    }

    #[inline]
    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    #[inline]
    pub fn into_vertices(self) -> Vec<PathVertex> {
        self.vertices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn first_point(&self) -> Option<Point> {
        self.vertices.first().map(|v| v.point)
    }

    #[inline]
    pub fn last_point(&self) -> Option<Point> {
        self.vertices.last().map(|v| v.point)
    }

    /// Path length in mm.
    pub fn length(&self) -> CoordF {
        estimate_path_length(&self.vertices)
    }

    /// True if any segment is an arc.
    pub fn has_arcs(&self) -> bool {
        self.vertices.iter().any(|v| !v.is_linear())
    }

    /// Get a reversed copy.
    pub fn reversed(&self) -> Self {
        let mut vertices = self.vertices.clone();
        reverse_path(&mut vertices);
        Self { vertices }
    }
}
