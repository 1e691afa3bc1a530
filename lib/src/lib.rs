//! # Slicer Wipe
//!
//! Wipe-path generation for 3D-printing motion control.
//!
//! After a perimeter or other feature has been extruded, the print head
//! retracts filament while moving back over the tail of what it just printed.
//! This library provides:
//! - Accumulation of a bounded-length wipe path from extrusion paths
//! - The wipe emitter, which walks that path and turns it into quantized
//!   G1/G2/G3 moves synchronized with the retraction budget
//! - Seam-hiding helpers: arc-length sampling of extrusion paths and the
//!   inward seam-hiding point of a closed loop
//!
//! ## Example
//!
//! ```rust,ignore
//! use slicer_wipe::{GCodeGenerator, PrintConfig, Wipe};
//!
//! let config = PrintConfig::from_json_file("printer.json")?;
//! let mut gcodegen = GCodeGenerator::new(config, &[0]);
//! let mut wipe = Wipe::default();
//! wipe.init(gcodegen.config(), &[0]);
//! wipe.set_path(&paths, false);
//! let gcode = gcodegen.retract_and_wipe(&mut wipe, false);
//! ```

pub mod config;
pub mod gcode;
pub mod geometry;

pub use config::{ExtruderConfig, FloatOrPercent, PrintConfig, PrintRegionConfig};
pub use gcode::{
    longer_than, sample_path_point_at_distance_from_end, sample_path_point_at_distance_from_start,
    wipe_hide_seam, ExtrusionPath, ExtrusionPaths, ExtrusionRole, GCodeCommand, GCodeFormatter,
    GCodeGenerator, GCodeWriter, Tool, ToolKind, Wipe, WipeError, WipeSpeed,
};
pub use geometry::{
    ArcDirection, ArcPolyline, PathVertex, Point, Point3F, PointF, SegmentKind,
};

/// Coordinate type used throughout the library.
/// Using i64 for integer coordinates (scaled by SCALING_FACTOR) to avoid floating-point issues.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values.
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// 1 unit = 1 nanometer, so 1mm = 1_000_000 units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Tolerance used when comparing unscaled lengths and extrusion amounts.
pub const EPSILON: f64 = 1e-4;

/// Scale a floating-point coordinate to integer.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to floating-point.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Scale a floating-point coordinate to integer (same as scale, for compatibility).
#[inline]
pub fn scaled(v: CoordF) -> Coord {
    scale(v)
}

/// Unscale an integer coordinate to floating-point (same as unscale, for compatibility).
#[inline]
pub fn unscaled(v: Coord) -> CoordF {
    unscale(v)
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for library operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("G-code error: {0}")]
    GCode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        // 1mm should scale to 1_000_000
        assert_eq!(scale(1.0), 1_000_000);

        // And back
        assert!((unscale(1_000_000) - 1.0).abs() < 1e-10);

        // Sub-millimeter precision
        assert_eq!(scale(0.001), 1_000);
        assert_eq!(scaled(0.0001), 100);
        assert!((unscaled(-2_500_000) + 2.5).abs() < 1e-12);
    }
}
