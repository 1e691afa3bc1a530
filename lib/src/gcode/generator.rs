//! Per-pass G-code generation context.
//!
//! The generator owns everything a generation pass mutates besides the wipe
//! state: the configuration, the machine-state writer, the active region and
//! the last position in object coordinates.

use super::wipe::Wipe;
use super::writer::GCodeWriter;
use crate::config::{PrintConfig, PrintRegionConfig};
use crate::geometry::{Point, PointF};
use crate::{scale, unscale};
use log::debug;

/// G-code generation context.
#[derive(Debug, Clone)]
pub struct GCodeGenerator {
    config: PrintConfig,
    writer: GCodeWriter,
    region: Option<PrintRegionConfig>,
    /// Offset of object coordinates in machine space (mm).
    origin: PointF,
    /// Last position in object coordinates (scaled).
    last_pos: Point,
}

impl GCodeGenerator {
    /// Create a generator for the given extruders.
    pub fn new(config: PrintConfig, extruder_ids: &[usize]) -> Self {
        let writer = GCodeWriter::new(&config, extruder_ids);
        Self {
            config,
            writer,
            region: None,
            origin: PointF::zero(),
            last_pos: Point::zero(),
        }
    }

    #[inline]
    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    #[inline]
    pub fn writer(&self) -> &GCodeWriter {
        &self.writer
    }

    #[inline]
    pub fn writer_mut(&mut self) -> &mut GCodeWriter {
        &mut self.writer
    }

    /// Region whose settings override the global ones, if any.
    #[inline]
    pub fn region(&self) -> Option<&PrintRegionConfig> {
        self.region.as_ref()
    }

    pub fn set_region(&mut self, region: Option<PrintRegionConfig>) {
        self.region = region;
    }

    #[inline]
    pub fn origin(&self) -> PointF {
        self.origin
    }

    pub fn set_origin(&mut self, origin: PointF) {
        self.origin = origin;
    }

    #[inline]
    pub fn enable_cooling_markers(&self) -> bool {
        self.config.enable_cooling_markers
    }

    /// Convert an object point to machine coordinates (mm).
    pub fn point_to_gcode(&self, point: Point) -> PointF {
        PointF::new(
            unscale(point.x) + self.origin.x,
            unscale(point.y) + self.origin.y,
        )
    }

    /// Convert an object point to machine coordinates, rounded to output precision.
    pub fn point_to_gcode_quantized(&self, point: Point) -> PointF {
        self.writer.formatter().quantize(self.point_to_gcode(point))
    }

    /// Convert machine coordinates back to an object point.
    pub fn gcode_to_point(&self, point: PointF) -> Point {
        Point::new(
            scale(point.x - self.origin.x),
            scale(point.y - self.origin.y),
        )
    }

    #[inline]
    pub fn last_pos(&self) -> Point {
        self.last_pos
    }

    pub fn set_last_pos(&mut self, pos: Point) {
        self.last_pos = pos;
    }

    /// Wipe along the stored path, then retract whatever the wipe left over.
    pub fn retract_and_wipe(&mut self, wipe: &mut Wipe, toolchange: bool) -> String {
        if !self.writer.tool_is_extruder() {
            wipe.reset_path();
            return String::new();
        }
        let mut gcode = wipe.wipe(self, toolchange);
        let length = self.retract_length(toolchange);
        let retract = self.writer.retract(length);
        if !retract.is_empty() {
            debug!("retracting the remainder of {:.5}mm in place", length);
        }
        gcode.push_str(&retract);
        gcode
    }

    /// Retraction length for a move leaving the current region.
    pub fn retract_length(&self, toolchange: bool) -> f64 {
        let Some(tool) = self.writer.tool() else {
            return 0.0;
        };
        if toolchange {
            tool.retract_length_toolchange()
        } else {
            self.region
                .as_ref()
                .and_then(PrintRegionConfig::retract_length_override)
                .unwrap_or_else(|| tool.retract_length())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtruderConfig;
    use crate::gcode::{ExtrusionPath, ExtrusionRole};

    #[test]
    fn test_point_conversion_with_origin() {
        let mut gen = GCodeGenerator::new(PrintConfig::default(), &[0]);
        gen.set_origin(PointF::new(100.0, 50.0));
        let p = Point::new_scale(1.5, -2.0);
        let g = gen.point_to_gcode(p);
        assert!(g.approx_eq(&PointF::new(101.5, 48.0), 1e-12));
        assert_eq!(gen.gcode_to_point(g), p);
    }

    #[test]
    fn test_quantized_conversion() {
        let gen = GCodeGenerator::new(PrintConfig::default(), &[0]);
        let q = gen.point_to_gcode_quantized(Point::new(1_234_567, 0));
        assert_eq!(q, PointF::new(1.235, 0.0));
    }

    #[test]
    fn test_retract_length_selection() {
        let config = PrintConfig::default().extruders(vec![ExtruderConfig::default()
            .retract_length(1.0)
            .retract_length_toolchange(3.0)]);
        let mut gen = GCodeGenerator::new(config, &[0]);
        assert_eq!(gen.retract_length(false), 1.0);
        assert_eq!(gen.retract_length(true), 3.0);
        gen.set_region(Some(PrintRegionConfig::new().print_retract_length(0.5)));
        assert_eq!(gen.retract_length(false), 0.5);
        assert_eq!(gen.retract_length(true), 3.0);
    }

    #[test]
    fn test_retract_without_wipe_path() {
        let mut gen = GCodeGenerator::new(PrintConfig::default(), &[0]);
        let mut wipe = Wipe::default();
        let gcode = gen.retract_and_wipe(&mut wipe, false);
        assert_eq!(gcode, "G1 E-0.80000 F2400\n");
    }

    #[test]
    fn test_retract_and_wipe_finishes_retraction() {
        // Ratio 0.95 * 40 / 96; a 1mm path covers about 0.396 of 0.8.
        let mut gen = GCodeGenerator::new(PrintConfig::default(), &[0]);
        let mut wipe = Wipe::default();
        wipe.init(gen.config(), &[0]);
        let path = ExtrusionPath::from_points(
            &[Point::new_scale(0.0, 0.0), Point::new_scale(1.0, 0.0)],
            ExtrusionRole::Perimeter,
        );
        gen.set_last_pos(Point::new_scale(1.0, 0.0));
        wipe.set_path(&[path], true);
        let gcode = gen.retract_and_wipe(&mut wipe, false);
        assert!(gcode.starts_with(";WIPE_START\n"));
        assert!(gcode.contains(";WIPE_END\n"));
        let retracted = gen.writer().tool().map(|t| t.retracted()).unwrap_or(0.0);
        assert!((retracted - 0.8).abs() < 1e-9);
        assert!(!wipe.has_path());
    }
}
