//! Wipe while retracting.
//!
//! After a feature is printed the tail of its extrusion paths is stored here.
//! When the generator retracts next, [`Wipe::wipe`] walks that stored path
//! backwards over the printed surface and spreads the retraction along the
//! moves, so the nozzle is not standing still while the pressure drops.
//!
//! The stored path is bounded by [`Wipe::max_length`]: anything longer than
//! the longest retraction can cover is never walked.

use super::generator::GCodeGenerator;
use super::path::ExtrusionPath;
use super::writer::{GCodeFormatter, GCodeWriter};
use crate::config::PrintConfig;
use crate::geometry::{arc_angle, arc_center, PathVertex, Point, Point3F, PointF, SegmentKind};
use crate::{unscale, CoordF, EPSILON};
use log::{debug, trace, warn};
use thiserror::Error;

/// Reasons a path cannot be stored for wiping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WipeError {
    /// Two consecutive paths do not share their end points.
    #[error("extrusion paths are not contiguous: expected {expected}, found {found}")]
    Discontinuity { expected: Point, found: Point },

    /// The starting path has fewer than two vertices.
    #[error("wipe path needs at least two vertices, got {0}")]
    DegeneratePath(usize),
}

/// Feedrate of the wipe moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WipeSpeed {
    /// Speed in mm/s.
    pub speed: CoordF,
    /// True when the extruder's `wipe_speed` was used rather than the travel-derived default.
    pub explicit: bool,
}

/// Wipe state of one generation pass.
#[derive(Debug, Clone, Default)]
pub struct Wipe {
    enabled: bool,
    /// Longest path worth storing (mm).
    max_length: CoordF,
    path: Vec<PathVertex>,
    /// Shift applied to the stored path when it is replayed.
    offset: Point,
}

impl Wipe {
    /// Create a disabled wipe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable wiping for the given extruders and derive the maximum path length.
    ///
    /// Wiping is disabled when none of them has `wipe` set.
    pub fn init(&mut self, config: &PrintConfig, extruder_ids: &[usize]) {
        self.reset_path();

        let multiple_extruders = extruder_ids.len() > 1;
        let mut max_length: CoordF = 0.0;
        for &id in extruder_ids {
            let Some(extruder) = config.extruder(id) else {
                continue;
            };
            if !extruder.wipe {
                continue;
            }
            let xy_to_e = Self::calc_xy_to_e_ratio(config, id);
            if xy_to_e <= 0.0 {
                continue;
            }
            max_length = max_length.max(extruder.retract_length / xy_to_e);
            if multiple_extruders {
                max_length = max_length.max(extruder.retract_length_toolchange / xy_to_e);
            }
        }

        if max_length > 0.0 {
            debug!("wipe enabled, max length {:.3}mm", max_length);
            self.enable(max_length);
        } else {
            debug!("wipe disabled");
            self.disable();
        }
    }

    pub fn enable(&mut self, max_length: CoordF) {
        self.enabled = true;
        self.max_length = max_length;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn max_length(&self) -> CoordF {
        self.max_length
    }

    /// Stored path, empty or with at least two vertices.
    #[inline]
    pub fn path(&self) -> &[PathVertex] {
        &self.path
    }

    #[inline]
    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn reset_path(&mut self) {
        self.path.clear();
    }

    #[inline]
    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Point) {
        self.offset = offset;
    }

    /// Store the tail of `paths` for the next wipe, walking them backwards when `reversed`.
    ///
    /// Accumulation stops at a bridge or where the paths are not contiguous;
    /// whatever was gathered up to there is kept.
    pub fn set_path(&mut self, paths: &[ExtrusionPath], reversed: bool) {
        if let Err(err) = self.try_set_path(paths, reversed) {
            warn!("wipe path truncated: {}", err);
        }
    }

    /// Like [`Wipe::set_path`], reporting why accumulation stopped early.
    pub fn try_set_path(
        &mut self,
        paths: &[ExtrusionPath],
        reversed: bool,
    ) -> Result<(), WipeError> {
        self.reset_path();
        if !self.enabled || paths.is_empty() {
            return Ok(());
        }

        let ordered: Vec<&ExtrusionPath> = if reversed {
            paths.iter().rev().collect()
        } else {
            paths.iter().collect()
        };
        let mut ordered = ordered.into_iter();
        let Some(first) = ordered.next() else {
            return Ok(());
        };

        for v in oriented_vertices(first, reversed) {
            push_vertex(&mut self.path, v);
        }
        if self.path.len() < 2 {
            self.path.clear();
            return Err(WipeError::DegeneratePath(first.size()));
        }
        let mut length = first.length();

        let mut result = Ok(());
        for next in ordered {
            if length >= self.max_length {
                break;
            }
            if next.is_bridge() {
                trace!("wipe path stops at a bridge");
                break;
            }
            let vertices = oriented_vertices(next, reversed);
            let (Some(tail), Some(entry)) = (self.path.last(), vertices.first()) else {
                break;
            };
            if tail.point != entry.point {
                result = Err(WipeError::Discontinuity {
                    expected: tail.point,
                    found: entry.point,
                });
                break;
            }
            for v in vertices {
                push_vertex(&mut self.path, v);
            }
            length += next.length();
        }

        if let Some(last) = self.path.last_mut() {
            last.kind = SegmentKind::Linear;
        }
        debug!(
            "wipe path: {} vertices, {:.3}mm (max {:.3}mm)",
            self.path.len(),
            length,
            self.max_length
        );
        result
    }

    /// Feedrate of the wipe moves for the given extruder.
    pub fn calc_wipe_speed(config: &PrintConfig, extruder_id: usize) -> WipeSpeed {
        match config.extruder(extruder_id) {
            Some(extruder) if extruder.wipe_speed > 0.0 => WipeSpeed {
                speed: extruder.wipe_speed,
                explicit: true,
            },
            _ => WipeSpeed {
                speed: config.travel_speed * 0.8,
                explicit: false,
            },
        }
    }

    /// Filament to retract per mm of wipe travel, so the retraction lasts as
    /// long as the move at the wipe speed.
    pub fn calc_xy_to_e_ratio(config: &PrintConfig, extruder_id: usize) -> CoordF {
        let Some(extruder) = config.extruder(extruder_id) else {
            return 0.0;
        };
        let speed = Self::calc_wipe_speed(config, extruder_id).speed;
        if speed <= 0.0 {
            return 0.0;
        }
        0.95 * (extruder.retract_speed + 0.5).floor() / speed
    }

    /// Emit the wipe moves for the stored path and clear it.
    ///
    /// The moves start from the generator's last position and retract at
    /// most the retraction still to go for this move. Whatever they do not
    /// cover is left for a plain retraction by the caller. Returns an empty
    /// string when nothing was emitted.
    pub fn wipe(&mut self, gcodegen: &mut GCodeGenerator, toolchange: bool) -> String {
        let path = std::mem::take(&mut self.path);
        let mut gcode = String::new();

        let Some(tool) = gcodegen.writer().tool().filter(|t| t.is_extruder()) else {
            return gcode;
        };
        let tool_id = tool.id();
        let retract_length = tool.retract_to_go(gcodegen.retract_length(toolchange));
        if retract_length <= 0.0 || path.is_empty() {
            return gcode;
        }

        let config = gcodegen.config();
        let Some(extruder) = config.extruder(tool_id) else {
            return gcode;
        };
        let xy_to_e = Self::calc_xy_to_e_ratio(config, tool_id);
        if xy_to_e <= 0.0 {
            return gcode;
        }
        let lift = extruder.wipe_lift.get_abs_value(extruder.nozzle_diameter);
        let initial_z = gcodegen.writer().get_position().z;
        let fmt = *gcodegen.writer().formatter();
        let mut precision = (fmt.xyz_resolution() * 1.5).max(EPSILON * 10.0);
        if config.resolution > 0.0 {
            precision = precision.max(config.resolution);
        }
        let speed = Self::calc_wipe_speed(config, tool_id);
        let gcode_comments = config.gcode_comments;
        let mut run = WipeRun {
            fmt,
            xy_to_e,
            precision,
            firmware_retraction: gcodegen.writer().use_firmware_retraction(),
            lift_per_mm: xy_to_e * lift / retract_length,
            final_z: initial_z + lift,
            remaining: retract_length,
            current_z: initial_z,
        };
        trace!(
            "wiping {:.5}mm of retraction over {} vertices",
            retract_length,
            path.len()
        );

        let mut prev = gcodegen.point_to_gcode_quantized(gcodegen.last_pos());
        let mut incoming = SegmentKind::Linear;
        for vertex in &path {
            let target = gcodegen.point_to_gcode(vertex.point + self.offset);
            let writer = gcodegen.writer_mut();
            let outcome = match incoming {
                SegmentKind::Linear => run.linear_step(writer, &mut gcode, prev, target),
                SegmentKind::Arc { radius, direction } => run.arc_step(
                    writer,
                    &mut gcode,
                    prev,
                    target,
                    unscale(radius),
                    direction.is_ccw(),
                ),
            };
            incoming = vertex.kind;
            match outcome {
                StepOutcome::Skipped => {}
                StepOutcome::Continue(p) => prev = p,
                StepOutcome::Finished(p) => {
                    prev = p;
                    break;
                }
            }
        }

        let last_pos = gcodegen.gcode_to_point(prev);
        gcodegen.set_last_pos(last_pos);
        if run.lift_per_mm != 0.0 {
            let writer = gcodegen.writer_mut();
            let dz = writer.get_position().z - initial_z;
            writer.set_lift(dz);
        }

        if gcode.is_empty() {
            return gcode;
        }
        let writer = gcodegen.writer();
        let comment = if gcode_comments {
            if speed.explicit {
                "wipe_speed"
            } else {
                "travel_speed * 0.8"
            }
        } else {
            ""
        };
        let marker = if gcodegen.enable_cooling_markers() {
            ";_WIPE"
        } else {
            ""
        };
        let mut out = String::from(";WIPE_START\n");
        out.push_str(&writer.set_speed_mm_s(speed.speed, comment, marker));
        out.push_str(&gcode);
        out.push_str(";WIPE_END\n");
        debug!(
            "wipe emitted, {:.5}mm of retraction left",
            run.remaining.max(0.0)
        );
        out
    }
}

/// Orient a path's vertices in walking direction.
fn oriented_vertices(path: &ExtrusionPath, reversed: bool) -> Vec<PathVertex> {
    if reversed {
        path.as_polyline().reversed().into_vertices()
    } else {
        path.as_polyline().vertices().to_vec()
    }
}

/// Append `v`, merging it into the tail when both sit on the same point.
fn push_vertex(path: &mut Vec<PathVertex>, v: PathVertex) {
    match path.last_mut() {
        Some(tail) if tail.point == v.point => tail.kind = v.kind,
        _ => path.push(v),
    }
}

/// Result of one wipe step.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StepOutcome {
    /// Nothing emitted, keep the previous point.
    Skipped,
    /// Moved to the point, budget left.
    Continue(PointF),
    /// Budget used up at the point.
    Finished(PointF),
}

/// Parameters and running state of one wipe.
#[derive(Debug, Clone)]
struct WipeRun {
    fmt: GCodeFormatter,
    xy_to_e: CoordF,
    /// Shortest straight move worth emitting (mm).
    precision: CoordF,
    firmware_retraction: bool,
    lift_per_mm: CoordF,
    final_z: CoordF,
    /// Retraction left (mm of filament).
    remaining: CoordF,
    current_z: CoordF,
}

impl WipeRun {
    fn e_word(&self, de: CoordF) -> CoordF {
        if self.firmware_retraction {
            0.0
        } else {
            -de
        }
    }

    fn lift_z(&mut self, seg_len: CoordF) -> CoordF {
        self.current_z = (self.current_z + seg_len * self.lift_per_mm).min(self.final_z);
        self.current_z
    }

    /// The budget does not reach any representable point; hand it to the next E move.
    fn defer(&mut self, writer: &mut GCodeWriter, prev: PointF) -> StepOutcome {
        if !self.firmware_retraction {
            writer.add_de_delayed(self.remaining);
        }
        self.remaining = 0.0;
        StepOutcome::Finished(prev)
    }

    fn linear_step(
        &mut self,
        writer: &mut GCodeWriter,
        gcode: &mut String,
        prev: PointF,
        target: PointF,
    ) -> StepOutcome {
        let mut p = self.fmt.quantize(target);
        if p == prev {
            return StepOutcome::Skipped;
        }
        let mut seg_len = p.distance(&prev);
        if seg_len < self.precision {
            return StepOutcome::Skipped;
        }
        let mut de = self.fmt.quantize_e(self.xy_to_e * seg_len);
        let mut done = false;
        if de > self.remaining - EPSILON {
            if de > self.remaining + EPSILON {
                p = self
                    .fmt
                    .quantize(prev + (target - prev) * (self.remaining / de));
                if p == prev {
                    return self.defer(writer, prev);
                }
                seg_len = p.distance(&prev);
            }
            de = self.remaining;
            done = true;
        }

        let e = self.e_word(de);
        let line = if self.lift_per_mm == 0.0 {
            writer.extrude_to_xy(p, e, "wipe and retract")
        } else {
            let z = self.lift_z(seg_len);
            writer.extrude_to_xyz(Point3F::from_xy(p, z), e, "wipe and retract")
        };
        gcode.push_str(&line);
        self.remaining -= de;
        trace!("wipe line to {}, {:.5}mm left", p, self.remaining);

        if done {
            StepOutcome::Finished(p)
        } else {
            StepOutcome::Continue(p)
        }
    }

    fn arc_step(
        &mut self,
        writer: &mut GCodeWriter,
        gcode: &mut String,
        prev: PointF,
        target: PointF,
        radius: CoordF,
        ccw: bool,
    ) -> StepOutcome {
        let mut p = self.fmt.quantize(target);
        if p == prev {
            return StepOutcome::Skipped;
        }
        if radius == 0.0 {
            return self.linear_step(writer, gcode, prev, target);
        }
        let mut center = arc_center(prev, p, radius, ccw);
        let mut angle = arc_angle(prev, p, radius);
        let mut seg_len = angle * radius.abs();
        let mut de = self.fmt.quantize_e(self.xy_to_e * seg_len);
        let mut done = false;
        if de > self.remaining - EPSILON {
            if de > self.remaining + EPSILON {
                center = arc_center(prev, target, radius, ccw);
                angle = arc_angle(prev, target, radius);
                seg_len = angle * radius.abs();
                de = self.xy_to_e * seg_len;
                let fraction = self.remaining / de;
                let rotation = fraction * if ccw { angle } else { -angle };
                p = self.fmt.quantize(center + (prev - center).rotate(rotation));
                if p == prev {
                    return self.defer(writer, prev);
                }
                seg_len *= fraction;
            }
            de = self.remaining;
            done = true;
        }

        let ij = self.fmt.quantize(center - prev);
        if ij.is_zero() {
            // Center collapsed onto the start point, the arc cannot be written.
            return self.linear_step(writer, gcode, prev, target);
        }

        let e = self.e_word(de);
        let line = if self.lift_per_mm == 0.0 {
            writer.extrude_arc_to_xy(p, ij, ccw, e, "wipe and retract")
        } else {
            let z = self.lift_z(seg_len);
            writer.extrude_arc_to_xyz(Point3F::from_xy(p, z), ij, ccw, e, "wipe and retract")
        };
        gcode.push_str(&line);
        self.remaining -= de;
        trace!("wipe arc to {}, {:.5}mm left", p, self.remaining);

        if done {
            StepOutcome::Finished(p)
        } else {
            StepOutcome::Continue(p)
        }
    }
}
