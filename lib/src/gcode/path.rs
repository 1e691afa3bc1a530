//! Extrusion paths.
//!
//! An [`ExtrusionPath`] is one already-extruded feature: an ordered run of
//! line and arc segments tagged with the role it was printed with. Several
//! contiguous paths (for example a perimeter loop split where its overhang
//! starts) form an [`ExtrusionPaths`] sequence.

use crate::geometry::{ArcPolyline, Point};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// Type of extrusion for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrusionRole {
    /// External (outer) perimeter.
    ExternalPerimeter,
    /// Internal perimeter.
    Perimeter,
    /// Perimeter printed over nothing.
    OverhangPerimeter,
    /// Sparse infill.
    InternalInfill,
    /// Solid infill (top/bottom surfaces).
    SolidInfill,
    /// Top solid infill (visible surface).
    TopSolidInfill,
    /// Bridge infill (over gaps).
    BridgeInfill,
    /// Gap fill (thin areas).
    GapFill,
    /// Skirt/brim.
    Skirt,
    /// Support material.
    SupportMaterial,
    /// Support interface.
    SupportMaterialInterface,
    /// Custom (user-defined).
    Custom,
}

impl ExtrusionRole {
    /// Check if this role is printed unsupported, in mid-air.
    pub fn is_bridge(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::BridgeInfill | ExtrusionRole::OverhangPerimeter
        )
    }

    /// Get a descriptive name for this role.
    pub fn name(&self) -> &'static str {
        match self {
            ExtrusionRole::ExternalPerimeter => "external perimeter",
            ExtrusionRole::Perimeter => "perimeter",
            ExtrusionRole::OverhangPerimeter => "overhang perimeter",
            ExtrusionRole::InternalInfill => "internal infill",
            ExtrusionRole::SolidInfill => "solid infill",
            ExtrusionRole::TopSolidInfill => "top solid infill",
            ExtrusionRole::BridgeInfill => "bridge infill",
            ExtrusionRole::GapFill => "gap fill",
            ExtrusionRole::Skirt => "skirt",
            ExtrusionRole::SupportMaterial => "support material",
            ExtrusionRole::SupportMaterialInterface => "support interface",
            ExtrusionRole::Custom => "custom",
        }
    }
}

/// A single extruded path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionPath {
    /// The path geometry (in scaled coordinates).
    pub polyline: ArcPolyline,

    /// The role/type of this extrusion.
    pub role: ExtrusionRole,
}

/// A run of contiguous extrusion paths.
pub type ExtrusionPaths = Vec<ExtrusionPath>;

impl ExtrusionPath {
    /// Create a new extrusion path.
    pub fn new(polyline: ArcPolyline, role: ExtrusionRole) -> Self {
        Self { polyline, role }
    }

    /// Create a path of straight segments.
    pub fn from_points(points: &[Point], role: ExtrusionRole) -> Self {
        Self::new(ArcPolyline::from_points(points), role)
    }

    /// The line/arc representation of this path.
    #[inline]
    pub fn as_polyline(&self) -> &ArcPolyline {
        &self.polyline
    }

    /// Number of vertices.
    #[inline]
    pub fn size(&self) -> usize {
        self.polyline.len()
    }

    /// Get the first point.
    pub fn first_point(&self) -> Option<Point> {
        self.polyline.first_point()
    }

    /// Get the last point.
    pub fn last_point(&self) -> Option<Point> {
        self.polyline.last_point()
    }

    /// Get the path length in mm.
    pub fn length(&self) -> CoordF {
        self.polyline.length()
    }

    /// Check if this is a bridge extrusion.
    pub fn is_bridge(&self) -> bool {
        self.role.is_bridge()
    }

    /// Reverse the path direction.
    pub fn reverse(&mut self) {
        self.polyline = self.polyline.reversed();
    }

    /// Get a reversed copy.
    pub fn reversed(&self) -> Self {
        let mut copy = self.clone();
        copy.reverse();
        copy
    }
}
