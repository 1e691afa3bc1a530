//! Print region configuration.
//!
//! A region is a section of a print object that may override global
//! settings. Only the retraction override matters to the wipe engine.

use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for a specific print region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintRegionConfig {
    /// Retraction length override for moves leaving this region (mm).
    /// Negative means "not set", use the extruder's value.
    pub print_retract_length: CoordF,
}

impl PrintRegionConfig {
    /// Create a region config with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: override the retraction length.
    pub fn print_retract_length(mut self, length: CoordF) -> Self {
        self.print_retract_length = length;
        self
    }

    /// The retraction override, if one is set.
    pub fn retract_length_override(&self) -> Option<CoordF> {
        (self.print_retract_length >= 0.0).then_some(self.print_retract_length)
    }
}

impl Default for PrintRegionConfig {
    fn default() -> Self {
        Self {
            print_retract_length: -1.0,
        }
    }
}

impl fmt::Display for PrintRegionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.retract_length_override() {
            Some(len) => write!(f, "PrintRegionConfig(retract={:.3}mm)", len),
            None => write!(f, "PrintRegionConfig(retract=default)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_override() {
        assert_eq!(PrintRegionConfig::default().retract_length_override(), None);
    }

    #[test]
    fn test_zero_override_is_set() {
        let config = PrintRegionConfig::new().print_retract_length(0.0);
        assert_eq!(config.retract_length_override(), Some(0.0));
    }
}
