//! Geometry primitives for wipe-path generation.
//!
//! This module provides the geometric types the wipe engine works on:
//! - [`Point`] - 2D point with integer coordinates (scaled)
//! - [`PointF`] and [`Point3F`] - 2D and 3D points with floating-point coordinates (unscaled, mm)
//! - [`PathVertex`] and [`ArcPolyline`] - paths made of line and circular-arc segments
//!
//! ## Coordinate System
//!
//! Extrusion paths are stored in scaled integer coordinates, scaled by
//! `SCALING_FACTOR` (1,000,000), so 1 unit = 1 nanometer. Everything that
//! reaches the G-code writer is unscaled to mm first.
//!
//! - Use `scale()` / `scaled()` to convert from mm to internal units
//! - Use `unscale()` / `unscaled()` to convert from internal units to mm

pub mod arc;
mod point;

pub use arc::{
    arc_angle, arc_center, arc_length, estimate_path_length, reverse_path, segment_length,
    ArcDirection, ArcPolyline, PathVertex, SegmentKind,
};
pub use point::{Point, Point3F, PointF};

use crate::CoordF;

/// Calculate the cross product of two 2D vectors (returns a scalar).
#[inline]
pub fn cross2f(v1: PointF, v2: PointF) -> CoordF {
    v1.x * v2.y - v1.y * v2.x
}

/// Calculate the dot product of two 2D vectors.
#[inline]
pub fn dot2f(v1: PointF, v2: PointF) -> CoordF {
    v1.x * v2.x + v1.y * v2.y
}

/// Signed counter-clockwise angle from `v1` to `v2`, in `[-PI, PI]`.
pub fn angle_ccw(v1: PointF, v2: PointF) -> CoordF {
    cross2f(v1, v2).atan2(dot2f(v1, v2))
}
