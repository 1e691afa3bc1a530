//! Seam hiding.
//!
//! Arc-length sampling along a run of extrusion paths, and the point a
//! closed loop should wipe towards so the seam ends up tucked inside the
//! loop rather than along one of its edges.

use super::path::ExtrusionPath;
use crate::geometry::{
    angle_ccw, arc_angle, arc_center, segment_length, ArcPolyline, PathVertex, Point, SegmentKind,
};
use crate::{unscale, CoordF, EPSILON};
use log::trace;
use std::f64::consts::PI;

/// True when the summed length of `paths` exceeds `length` (mm).
pub fn longer_than(paths: &[ExtrusionPath], length: CoordF) -> bool {
    let mut left = length;
    for path in paths {
        for w in path.as_polyline().vertices().windows(2) {
            left -= segment_length(&w[0], w[1].point);
            if left < 0.0 {
                return true;
            }
        }
    }
    false
}

/// Point at `distance` (mm) along `from`'s segment, if the segment is long enough.
fn sample_segment(from: &PathVertex, to: Point, distance: &mut CoordF) -> Option<Point> {
    let len = segment_length(from, to);
    if *distance > len {
        *distance -= len;
        return None;
    }
    if len <= 0.0 {
        return Some(from.point);
    }
    let (a, b) = (from.point.to_f64(), to.to_f64());
    let p = match from.kind {
        SegmentKind::Linear => a + (b - a) * (*distance / len),
        SegmentKind::Arc { radius, direction } => {
            let radius = unscale(radius);
            let center = arc_center(a, b, radius, direction.is_ccw());
            let uncovered = arc_angle(a, b, radius) * (len - *distance) / len;
            let back = if direction.is_ccw() {
                -uncovered
            } else {
                uncovered
            };
            b.rotate_around(back, center)
        }
    };
    Some(Point::from(p))
}

fn sample_polylines<'a, I>(polylines: I, distance: CoordF) -> Option<Point>
where
    I: IntoIterator<Item = &'a ArcPolyline>,
{
    if distance < 0.0 {
        return None;
    }
    let mut left = distance;
    let mut last = None;
    for polyline in polylines {
        for w in polyline.vertices().windows(2) {
            if let Some(p) = sample_segment(&w[0], w[1].point, &mut left) {
                return Some(p);
            }
        }
        last = polyline.last_point().or(last);
    }
    // Rounding may leave a hair of distance past the very end.
    if left <= EPSILON {
        last
    } else {
        None
    }
}

/// Point at `distance` (mm) from the start of `paths`, or `None` past their end.
pub fn sample_path_point_at_distance_from_start(
    paths: &[ExtrusionPath],
    distance: CoordF,
) -> Option<Point> {
    sample_polylines(paths.iter().map(ExtrusionPath::as_polyline), distance)
}

/// Point at `distance` (mm) from the end of `paths`, walking them backwards.
pub fn sample_path_point_at_distance_from_end(
    paths: &[ExtrusionPath],
    distance: CoordF,
) -> Option<Point> {
    let reversed: Vec<ArcPolyline> = paths
        .iter()
        .rev()
        .map(|p| p.as_polyline().reversed())
        .collect();
    sample_polylines(reversed.iter(), distance)
}

/// Target of the seam-hiding move at the end of a closed loop.
///
/// The move leaves the loop's end point at `wipe_length` (mm), turned from
/// the loop's start direction a third of the way into the wedge between the
/// start direction and the loop's last `wipe_length`. `is_hole` tells the
/// winding: clockwise holes turn the other way than counter-clockwise
/// contours. Loops not longer than 2.5 wipe lengths get no hiding point.
pub fn wipe_hide_seam(paths: &[ExtrusionPath], is_hole: bool, wipe_length: CoordF) -> Option<Point> {
    if !longer_than(paths, 2.5 * wipe_length) {
        return None;
    }
    let p_current = paths.last()?.last_point()?.to_f64();
    let mut p_next = paths.first()?.first_point()?.to_f64();

    let gap = p_next.distance(&p_current);
    let missing = wipe_length - gap;
    if missing > 0.0 {
        let ahead = sample_path_point_at_distance_from_start(paths, missing)?;
        if gap <= EPSILON {
            // Closed without a gap, head towards the path instead.
            p_next = ahead.to_f64();
        }
    }
    let p_prev = sample_path_point_at_distance_from_end(paths, wipe_length)?.to_f64();

    let forward = p_next - p_current;
    if forward.is_zero() {
        return None;
    }
    let mut angle = angle_ccw(forward, p_prev - p_current);
    if is_hole {
        if angle > 0.0 {
            angle -= 2.0 * PI;
        }
    } else if angle < 0.0 {
        angle += 2.0 * PI;
    }
    let dir = forward.normalize().rotate(angle / 3.0);
    let hide = p_current + dir * wipe_length;
    trace!(
        "seam hiding point {} ({:.1} deg off the loop start)",
        hide,
        (angle / 3.0).to_degrees()
    );
    Some(Point::from(hide))
}
