//! Print configuration types.
//!
//! This module provides the configuration read by the wipe engine and the
//! G-code writer: output precision, travel speed, retraction mode and the
//! per-extruder retraction and wipe settings.

use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// A value given either as an absolute length or as a percentage of another length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatOrPercent {
    pub value: CoordF,
    #[serde(default)]
    pub percent: bool,
}

impl FloatOrPercent {
    /// An absolute value.
    pub const fn abs(value: CoordF) -> Self {
        Self {
            value,
            percent: false,
        }
    }

    /// A percentage of the reference value.
    pub const fn percent(value: CoordF) -> Self {
        Self {
            value,
            percent: true,
        }
    }

    /// Resolve against `ratio_over` when given as a percentage.
    pub fn get_abs_value(&self, ratio_over: CoordF) -> CoordF {
        if self.percent {
            ratio_over * self.value / 100.0
        } else {
            self.value
        }
    }
}

/// Per-extruder retraction and wipe settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtruderConfig {
    /// Retraction length (mm).
    pub retract_length: CoordF,
    /// Retraction length before a tool change (mm).
    pub retract_length_toolchange: CoordF,
    /// Retraction speed (mm/s).
    pub retract_speed: CoordF,
    /// Move along the last printed path while retracting.
    pub wipe: bool,
    /// Wipe speed (mm/s), 0 = derived from travel speed.
    pub wipe_speed: CoordF,
    /// Lift the nozzle during the wipe, by this height at most.
    pub wipe_lift: FloatOrPercent,
    /// Nozzle diameter (mm).
    pub nozzle_diameter: CoordF,
}

impl ExtruderConfig {
    /// Create a new ExtruderConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the retraction length.
    pub fn retract_length(mut self, length: CoordF) -> Self {
        self.retract_length = length;
        self
    }

    /// Builder method: set the tool change retraction length.
    pub fn retract_length_toolchange(mut self, length: CoordF) -> Self {
        self.retract_length_toolchange = length;
        self
    }

    /// Builder method: set the retraction speed.
    pub fn retract_speed(mut self, speed: CoordF) -> Self {
        self.retract_speed = speed;
        self
    }

    /// Builder method: enable or disable wiping.
    pub fn wipe(mut self, enabled: bool) -> Self {
        self.wipe = enabled;
        self
    }

    /// Builder method: set an explicit wipe speed.
    pub fn wipe_speed(mut self, speed: CoordF) -> Self {
        self.wipe_speed = speed;
        self
    }

    /// Builder method: set the wipe lift.
    pub fn wipe_lift(mut self, lift: FloatOrPercent) -> Self {
        self.wipe_lift = lift;
        self
    }
}

impl Default for ExtruderConfig {
    fn default() -> Self {
        Self {
            retract_length: 0.8,
            retract_length_toolchange: 2.0,
            retract_speed: 40.0,
            wipe: true,
            wipe_speed: 0.0,
            wipe_lift: FloatOrPercent::abs(0.0),
            nozzle_diameter: 0.4,
        }
    }
}

/// Global configuration for G-code output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    // === Speeds (mm/s) ===
    /// Travel move speed.
    pub travel_speed: CoordF,

    // === Output precision ===
    /// Decimals written for X/Y/Z/I/J.
    pub gcode_precision_xyz: u32,
    /// Decimals written for E.
    pub gcode_precision_e: u32,
    /// Minimum segment length worth emitting (mm), 0 = off.
    pub resolution: CoordF,

    // === Retraction ===
    /// Retract with G10/G11 instead of E moves.
    pub use_firmware_retraction: bool,
    /// Relative (M83) instead of absolute (M82) E distances.
    pub use_relative_e_distances: bool,

    // === Annotations ===
    /// Write verbose comments.
    pub gcode_comments: bool,
    /// Write markers for the cooling post-processor.
    pub enable_cooling_markers: bool,

    // === Extruders ===
    /// Per-extruder settings, indexed by tool id.
    pub extruders: Vec<ExtruderConfig>,
}

impl PrintConfig {
    /// Create a new PrintConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.travel_speed <= 0.0 {
            return Err(Error::Config("travel_speed must be positive".to_string()));
        }
        if self.gcode_precision_xyz > 9 || self.gcode_precision_e > 9 {
            return Err(Error::Config(
                "gcode precision must be at most 9 decimals".to_string(),
            ));
        }
        for (id, extruder) in self.extruders.iter().enumerate() {
            if extruder.retract_speed < 0.0 || extruder.wipe_speed < 0.0 {
                return Err(Error::Config(format!(
                    "extruder {}: speeds must not be negative",
                    id
                )));
            }
            if extruder.nozzle_diameter <= 0.0 {
                return Err(Error::Config(format!(
                    "extruder {}: nozzle_diameter must be positive",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Builder method: set the travel speed.
    pub fn travel_speed(mut self, speed: CoordF) -> Self {
        self.travel_speed = speed;
        self
    }

    /// Builder method: replace the extruder list.
    pub fn extruders(mut self, extruders: Vec<ExtruderConfig>) -> Self {
        self.extruders = extruders;
        self
    }

    /// Builder method: enable firmware retraction.
    pub fn firmware_retraction(mut self, enabled: bool) -> Self {
        self.use_firmware_retraction = enabled;
        self
    }

    /// Builder method: set the minimum segment length.
    pub fn resolution(mut self, resolution: CoordF) -> Self {
        self.resolution = resolution;
        self
    }

    /// Builder method: enable verbose comments.
    pub fn gcode_comments(mut self, enabled: bool) -> Self {
        self.gcode_comments = enabled;
        self
    }

    /// Settings of the given extruder, if configured.
    pub fn extruder(&self, id: usize) -> Option<&ExtruderConfig> {
        self.extruders.get(id)
    }
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            travel_speed: 120.0,
            gcode_precision_xyz: 3,
            gcode_precision_e: 5,
            resolution: 0.0,
            use_firmware_retraction: false,
            use_relative_e_distances: true,
            gcode_comments: false,
            enable_cooling_markers: false,
            extruders: vec![ExtruderConfig::default()],
        }
    }
}

impl fmt::Display for PrintConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PrintConfig(travel={:.0}mm/s, extruders={}, firmware_retraction={})",
            self.travel_speed,
            self.extruders.len(),
            self.use_firmware_retraction
        )
    }
}
