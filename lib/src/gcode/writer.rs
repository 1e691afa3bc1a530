//! G-code writer.
//!
//! The writer tracks machine state (position, active tool, extruder E axis
//! and retraction) and turns moves into G-code text. Everything it emits is
//! first quantized to the configured output precision so the tracked
//! position always equals what the firmware will see.

use super::GCodeCommand;
use crate::config::{ExtruderConfig, PrintConfig};
use crate::geometry::{Point3F, PointF};
use crate::{CoordF, Error, Result};

/// Output precision of coordinates and extrusion amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GCodeFormatter {
    xyz_decimals: u32,
    e_decimals: u32,
}

impl Default for GCodeFormatter {
    fn default() -> Self {
        Self::new(3, 5)
    }
}

impl GCodeFormatter {
    /// Create a formatter writing `xyz_decimals` for positions and `e_decimals` for E.
    pub fn new(xyz_decimals: u32, e_decimals: u32) -> Self {
        Self {
            xyz_decimals,
            e_decimals,
        }
    }

    /// Create a formatter from the configured precision.
    pub fn from_config(config: &PrintConfig) -> Self {
        Self::new(config.gcode_precision_xyz, config.gcode_precision_e)
    }

    #[inline]
    fn quantize_value(v: CoordF, decimals: u32) -> CoordF {
        let s = 10f64.powi(decimals as i32);
        let q = (v * s).round() / s;
        // Avoid writing "-0.000".
        if q == 0.0 {
            0.0
        } else {
            q
        }
    }

    /// Smallest representable XY/Z step (mm).
    pub fn xyz_resolution(&self) -> CoordF {
        10f64.powi(-(self.xyz_decimals as i32))
    }

    /// Round a point to the XY output precision.
    pub fn quantize(&self, p: PointF) -> PointF {
        PointF::new(
            Self::quantize_value(p.x, self.xyz_decimals),
            Self::quantize_value(p.y, self.xyz_decimals),
        )
    }

    /// Round a height to the Z output precision.
    pub fn quantize_z(&self, z: CoordF) -> CoordF {
        Self::quantize_value(z, self.xyz_decimals)
    }

    /// Round an extrusion amount to the E output precision.
    pub fn quantize_e(&self, e: CoordF) -> CoordF {
        Self::quantize_value(e, self.e_decimals)
    }

    pub fn format_xyz(&self, v: CoordF) -> String {
        format!(
            "{:.*}",
            self.xyz_decimals as usize,
            Self::quantize_value(v, self.xyz_decimals)
        )
    }

    pub fn format_e(&self, v: CoordF) -> String {
        format!(
            "{:.*}",
            self.e_decimals as usize,
            Self::quantize_value(v, self.e_decimals)
        )
    }
}

/// What a tool does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Filament extruder.
    Extruder,
    /// Non-extruding tool (mill, laser, ...).
    Mill,
}

/// A tool and its E-axis state.
#[derive(Debug, Clone)]
pub struct Tool {
    id: usize,
    kind: ToolKind,
    config: ExtruderConfig,
    /// Absolute E position.
    e: CoordF,
    /// Filament currently retracted (mm).
    retracted: CoordF,
}

impl Tool {
    /// Create an extruder from its configuration.
    pub fn extruder(id: usize, config: ExtruderConfig) -> Self {
        Self {
            id,
            kind: ToolKind::Extruder,
            config,
            e: 0.0,
            retracted: 0.0,
        }
    }

    /// Create a non-extruding tool.
    pub fn mill(id: usize) -> Self {
        Self {
            id,
            kind: ToolKind::Mill,
            config: ExtruderConfig::default().wipe(false),
            e: 0.0,
            retracted: 0.0,
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    #[inline]
    pub fn is_extruder(&self) -> bool {
        self.kind == ToolKind::Extruder
    }

    #[inline]
    pub fn config(&self) -> &ExtruderConfig {
        &self.config
    }

    #[inline]
    pub fn retract_length(&self) -> CoordF {
        self.config.retract_length
    }

    #[inline]
    pub fn retract_length_toolchange(&self) -> CoordF {
        self.config.retract_length_toolchange
    }

    /// Absolute E position.
    #[inline]
    pub fn e(&self) -> CoordF {
        self.e
    }

    /// Filament currently retracted.
    #[inline]
    pub fn retracted(&self) -> CoordF {
        self.retracted
    }

    /// Part of `length` that is not retracted yet.
    pub fn retract_to_go(&self, length: CoordF) -> CoordF {
        (length - self.retracted).max(0.0)
    }

    /// Move the E axis by `de`, updating the retraction ledger.
    /// Returns the value to write: `de` in relative mode, the new E otherwise.
    fn extrude(&mut self, de: CoordF, relative: bool) -> CoordF {
        self.e += de;
        if de < 0.0 {
            self.retracted -= de;
        } else {
            self.retracted = (self.retracted - de).max(0.0);
        }
        if relative {
            de
        } else {
            self.e
        }
    }

    /// Move the E axis without touching the ledger.
    fn shift_e(&mut self, de: CoordF) {
        self.e += de;
    }
}

/// Machine-state tracker and G-code emitter.
#[derive(Debug, Clone)]
pub struct GCodeWriter {
    formatter: GCodeFormatter,
    tools: Vec<Tool>,
    tool: Option<usize>,
    position: Point3F,
    travel_speed: CoordF,
    use_relative_e: bool,
    use_firmware_retraction: bool,
    gcode_comments: bool,
    /// Retraction registered but not emitted yet; folded into the next E move.
    de_delayed: CoordF,
    /// Extra Z to drop on the next ordinary move.
    lifted: CoordF,
}

impl GCodeWriter {
    /// Create a writer with one extruder per id in `extruder_ids`.
    /// The first id becomes the active tool.
    pub fn new(config: &PrintConfig, extruder_ids: &[usize]) -> Self {
        let tools: Vec<Tool> = extruder_ids
            .iter()
            .map(|&id| Tool::extruder(id, config.extruder(id).cloned().unwrap_or_default()))
            .collect();
        let tool = if tools.is_empty() { None } else { Some(0) };
        Self {
            formatter: GCodeFormatter::from_config(config),
            tools,
            tool,
            position: Point3F::default(),
            travel_speed: config.travel_speed,
            use_relative_e: config.use_relative_e_distances,
            use_firmware_retraction: config.use_firmware_retraction,
            gcode_comments: config.gcode_comments,
            de_delayed: 0.0,
            lifted: 0.0,
        }
    }

    /// Register an additional tool.
    pub fn add_tool(&mut self, tool: Tool) {
        self.tools.push(tool);
        if self.tool.is_none() {
            self.tool = Some(self.tools.len() - 1);
        }
    }

    /// Make the tool with `id` active.
    pub fn select_tool(&mut self, id: usize) -> Result<()> {
        let idx = self
            .tools
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| Error::GCode(format!("unknown tool {}", id)))?;
        self.tool = Some(idx);
        Ok(())
    }

    /// All registered tools.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// The active tool.
    pub fn tool(&self) -> Option<&Tool> {
        self.tool.and_then(|i| self.tools.get(i))
    }

    fn tool_mut(&mut self) -> Option<&mut Tool> {
        match self.tool {
            Some(i) => self.tools.get_mut(i),
            None => None,
        }
    }

    /// True when the active tool extrudes filament.
    pub fn tool_is_extruder(&self) -> bool {
        self.tool().is_some_and(Tool::is_extruder)
    }

    #[inline]
    pub fn formatter(&self) -> &GCodeFormatter {
        &self.formatter
    }

    #[inline]
    pub fn travel_speed(&self) -> CoordF {
        self.travel_speed
    }

    #[inline]
    pub fn use_firmware_retraction(&self) -> bool {
        self.use_firmware_retraction
    }

    #[inline]
    pub fn get_position(&self) -> Point3F {
        self.position
    }

    pub fn set_position(&mut self, position: Point3F) {
        let xy = self.formatter.quantize(position.to_2d());
        self.position = Point3F::from_xy(xy, self.formatter.quantize_z(position.z));
    }

    /// Register retraction that could not be emitted; it is counted as
    /// retracted right away and written with the next E move.
    pub fn add_de_delayed(&mut self, de: CoordF) {
        if let Some(tool) = self.tool_mut() {
            tool.retracted += de;
            self.de_delayed += de;
        }
    }

    /// Pending retraction not written yet.
    #[inline]
    pub fn de_delayed(&self) -> CoordF {
        self.de_delayed
    }

    /// Register extra Z to be undone by the next ordinary move.
    pub fn set_lift(&mut self, dz: CoordF) {
        self.lifted = dz.max(0.0);
    }

    #[inline]
    pub fn lifted(&self) -> CoordF {
        self.lifted
    }

    /// Drop back down by the registered lift.
    pub fn unlift(&mut self) -> String {
        if self.lifted <= 0.0 {
            return String::new();
        }
        let z = self.formatter.quantize_z(self.position.z - self.lifted);
        self.lifted = 0.0;
        self.position.z = z;
        self.line(
            GCodeCommand::LinearMove {
                x: None,
                y: None,
                z: Some(z),
                e: None,
                f: Some(self.travel_speed * 60.0),
            },
            "unlift",
        )
    }

    /// Set the feedrate.
    pub fn set_speed_mm_s(&self, speed: CoordF, comment: &str, cooling_marker: &str) -> String {
        let mut gcode = GCodeCommand::LinearMove {
            x: None,
            y: None,
            z: None,
            e: None,
            f: Some(speed * 60.0),
        }
        .to_gcode_with(&self.formatter);
        gcode.push_str(cooling_marker);
        if !comment.is_empty() {
            gcode.push_str(" ; ");
            gcode.push_str(comment);
        }
        gcode.push('\n');
        gcode
    }

    /// Account for `de` on the active tool and return the E word to write.
    fn e_word(&mut self, de: CoordF) -> Option<CoordF> {
        let relative = self.use_relative_e;
        let delayed = self.de_delayed;
        let tool = self.tool_mut()?;
        tool.shift_e(-delayed);
        let written = tool.extrude(de, relative);
        let written = if relative { written - delayed } else { written };
        self.de_delayed = 0.0;
        if de == 0.0 && delayed == 0.0 {
            None
        } else {
            Some(written)
        }
    }

    /// Extrude (or retract, for negative `de`) along a straight line at the current Z.
    pub fn extrude_to_xy(&mut self, p: PointF, de: CoordF, comment: &str) -> String {
        let p = self.formatter.quantize(p);
        let e = self.e_word(de);
        self.position.x = p.x;
        self.position.y = p.y;
        self.line(
            GCodeCommand::LinearMove {
                x: Some(p.x),
                y: Some(p.y),
                z: None,
                e,
                f: None,
            },
            comment,
        )
    }

    /// Extrude along a straight line, changing Z as well.
    pub fn extrude_to_xyz(&mut self, p: Point3F, de: CoordF, comment: &str) -> String {
        let xy = self.formatter.quantize(p.to_2d());
        let z = self.formatter.quantize_z(p.z);
        let e = self.e_word(de);
        self.position = Point3F::new(xy.x, xy.y, z);
        self.line(
            GCodeCommand::LinearMove {
                x: Some(xy.x),
                y: Some(xy.y),
                z: Some(z),
                e,
                f: None,
            },
            comment,
        )
    }

    /// Extrude along an arc with center offset `ij` from the current position.
    pub fn extrude_arc_to_xy(
        &mut self,
        p: PointF,
        ij: PointF,
        ccw: bool,
        de: CoordF,
        comment: &str,
    ) -> String {
        self.arc(p, None, ij, ccw, de, comment)
    }

    /// Extrude along a helical arc ending at `p`.
    pub fn extrude_arc_to_xyz(
        &mut self,
        p: Point3F,
        ij: PointF,
        ccw: bool,
        de: CoordF,
        comment: &str,
    ) -> String {
        self.arc(p.to_2d(), Some(p.z), ij, ccw, de, comment)
    }

    fn arc(
        &mut self,
        p: PointF,
        z: Option<CoordF>,
        ij: PointF,
        ccw: bool,
        de: CoordF,
        comment: &str,
    ) -> String {
        let p = self.formatter.quantize(p);
        let ij = self.formatter.quantize(ij);
        let z = z.map(|z| self.formatter.quantize_z(z));
        let e = self.e_word(de);
        self.position.x = p.x;
        self.position.y = p.y;
        if let Some(z) = z {
            self.position.z = z;
        }
        let cmd = if ccw {
            GCodeCommand::ArcCCW {
                x: p.x,
                y: p.y,
                z,
                i: ij.x,
                j: ij.y,
                e,
            }
        } else {
            GCodeCommand::ArcCW {
                x: p.x,
                y: p.y,
                z,
                i: ij.x,
                j: ij.y,
                e,
            }
        };
        self.line(cmd, comment)
    }

    /// Retract in place up to `length` of filament in total.
    pub fn retract(&mut self, length: CoordF) -> String {
        let Some(tool) = self.tool() else {
            return String::new();
        };
        if !tool.is_extruder() {
            return String::new();
        }
        let to_go = self.formatter.quantize_e(tool.retract_to_go(length));
        if to_go <= 0.0 && self.de_delayed == 0.0 {
            return String::new();
        }
        if self.use_firmware_retraction {
            if let Some(tool) = self.tool_mut() {
                tool.retracted += to_go;
            }
            return self.line(GCodeCommand::FirmwareRetract, "retract");
        }
        let e = self.e_word(-to_go);
        self.line(
            GCodeCommand::LinearMove {
                x: None,
                y: None,
                z: None,
                e,
                f: Some(self.retract_speed() * 60.0),
            },
            "retract",
        )
    }

    /// Push back all retracted filament.
    pub fn unretract(&mut self) -> String {
        let Some(tool) = self.tool() else {
            return String::new();
        };
        let retracted = tool.retracted();
        if retracted <= 0.0 {
            return String::new();
        }
        if self.use_firmware_retraction {
            if let Some(tool) = self.tool_mut() {
                tool.retracted = 0.0;
            }
            return self.line(GCodeCommand::FirmwareUnretract, "unretract");
        }
        let e = self.e_word(retracted);
        self.line(
            GCodeCommand::LinearMove {
                x: None,
                y: None,
                z: None,
                e,
                f: Some(self.retract_speed() * 60.0),
            },
            "unretract",
        )
    }

    fn retract_speed(&self) -> CoordF {
        self.tool().map_or(0.0, |t| t.config().retract_speed)
    }

    fn line(&self, cmd: GCodeCommand, comment: &str) -> String {
        let mut gcode = cmd.to_gcode_with(&self.formatter);
        if self.gcode_comments && !comment.is_empty() {
            gcode.push_str(" ; ");
            gcode.push_str(comment);
        }
        gcode.push('\n');
        gcode
    }
}
