//! G-code generation module.
//!
//! This module provides the wipe engine and the pieces of G-code generation
//! it talks to: the machine-state writer, the per-pass generator context and
//! the extrusion paths that wipe moves are taken from.

mod generator;
mod path;
pub mod seam_hide;
pub mod wipe;
mod writer;

pub use generator::GCodeGenerator;
pub use path::{ExtrusionPath, ExtrusionPaths, ExtrusionRole};
pub use seam_hide::{
    longer_than, sample_path_point_at_distance_from_end, sample_path_point_at_distance_from_start,
    wipe_hide_seam,
};
pub use wipe::{Wipe, WipeError, WipeSpeed};
pub use writer::{GCodeFormatter, GCodeWriter, Tool, ToolKind};

use crate::geometry::ArcDirection;

/// G-code command types.
#[derive(Clone, Debug, PartialEq)]
pub enum GCodeCommand {
    /// G1 - Linear move (extrusion)
    LinearMove {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
        f: Option<f64>,
    },
    /// G2 - Clockwise arc
    ArcCW {
        x: f64,
        y: f64,
        z: Option<f64>,
        i: f64,
        j: f64,
        e: Option<f64>,
    },
    /// G3 - Counter-clockwise arc
    ArcCCW {
        x: f64,
        y: f64,
        z: Option<f64>,
        i: f64,
        j: f64,
        e: Option<f64>,
    },
    /// G10 - Firmware retract
    FirmwareRetract,
    /// G11 - Firmware unretract
    FirmwareUnretract,
}

impl GCodeCommand {
    /// Convert the command to a G-code string with the default precision.
    pub fn to_gcode(&self) -> String {
        self.to_gcode_with(&GCodeFormatter::default())
    }

    /// Convert the command to a G-code string using the formatter's precision.
    pub fn to_gcode_with(&self, fmt: &GCodeFormatter) -> String {
        match self {
            GCodeCommand::LinearMove { x, y, z, e, f } => {
                let mut cmd = String::from("G1");
                if let Some(v) = x {
                    cmd.push_str(&format!(" X{}", fmt.format_xyz(*v)));
                }
                if let Some(v) = y {
                    cmd.push_str(&format!(" Y{}", fmt.format_xyz(*v)));
                }
                if let Some(v) = z {
                    cmd.push_str(&format!(" Z{}", fmt.format_xyz(*v)));
                }
                if let Some(v) = e {
                    cmd.push_str(&format!(" E{}", fmt.format_e(*v)));
                }
                if let Some(v) = f {
                    cmd.push_str(&format!(" F{:.0}", v));
                }
                cmd
            }
            GCodeCommand::ArcCW { x, y, z, i, j, e } => {
                Self::arc_to_gcode(fmt, ArcDirection::Clockwise, *x, *y, *z, *i, *j, *e)
            }
            GCodeCommand::ArcCCW { x, y, z, i, j, e } => {
                Self::arc_to_gcode(fmt, ArcDirection::CounterClockwise, *x, *y, *z, *i, *j, *e)
            }
            GCodeCommand::FirmwareRetract => "G10".to_string(),
            GCodeCommand::FirmwareUnretract => "G11".to_string(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn arc_to_gcode(
        fmt: &GCodeFormatter,
        direction: ArcDirection,
        x: f64,
        y: f64,
        z: Option<f64>,
        i: f64,
        j: f64,
        e: Option<f64>,
    ) -> String {
        let mut cmd = format!(
            "{} X{} Y{}",
            direction.gcode_command(),
            fmt.format_xyz(x),
            fmt.format_xyz(y)
        );
        if let Some(v) = z {
            cmd.push_str(&format!(" Z{}", fmt.format_xyz(v)));
        }
        cmd.push_str(&format!(" I{} J{}", fmt.format_xyz(i), fmt.format_xyz(j)));
        if let Some(v) = e {
            cmd.push_str(&format!(" E{}", fmt.format_e(v)));
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_move() {
        let cmd = GCodeCommand::LinearMove {
            x: Some(10.0),
            y: Some(20.0),
            z: None,
            e: Some(-1.5),
            f: None,
        };
        assert_eq!(cmd.to_gcode(), "G1 X10.000 Y20.000 E-1.50000");
    }

    #[test]
    fn test_speed_only_move() {
        let cmd = GCodeCommand::LinearMove {
            x: None,
            y: None,
            z: None,
            e: None,
            f: Some(5760.0),
        };
        assert_eq!(cmd.to_gcode(), "G1 F5760");
    }

    #[test]
    fn test_arc_moves() {
        let cw = GCodeCommand::ArcCW {
            x: 10.0,
            y: 10.0,
            z: None,
            i: 5.0,
            j: 0.0,
            e: Some(-0.2),
        };
        assert_eq!(cw.to_gcode(), "G2 X10.000 Y10.000 I5.000 J0.000 E-0.20000");

        let ccw = GCodeCommand::ArcCCW {
            x: 1.0,
            y: 2.0,
            z: Some(0.3),
            i: -1.0,
            j: 0.5,
            e: None,
        };
        assert_eq!(ccw.to_gcode(), "G3 X1.000 Y2.000 Z0.300 I-1.000 J0.500");
    }

    #[test]
    fn test_custom_precision() {
        let fmt = GCodeFormatter::new(2, 3);
        let cmd = GCodeCommand::LinearMove {
            x: Some(1.0),
            y: Some(2.0),
            z: None,
            e: Some(-0.25),
            f: None,
        };
        assert_eq!(cmd.to_gcode_with(&fmt), "G1 X1.00 Y2.00 E-0.250");
    }

    #[test]
    fn test_arc_word_follows_direction() {
        for direction in [ArcDirection::Clockwise, ArcDirection::CounterClockwise] {
            let gcode = GCodeCommand::arc_to_gcode(
                &GCodeFormatter::default(),
                direction,
                1.0,
                0.0,
                None,
                -1.0,
                0.0,
                None,
            );
            assert!(gcode.starts_with(direction.gcode_command()));
        }
        assert_eq!(ArcDirection::Clockwise.gcode_command(), "G2");
        assert_eq!(ArcDirection::CounterClockwise.gcode_command(), "G3");
    }

    #[test]
    fn test_firmware_retraction() {
        assert_eq!(GCodeCommand::FirmwareRetract.to_gcode(), "G10");
        assert_eq!(GCodeCommand::FirmwareUnretract.to_gcode(), "G11");
    }
}
