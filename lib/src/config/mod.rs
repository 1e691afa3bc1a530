//! Configuration module for wipe and retraction settings.
//!
//! This module provides the configuration types read by the wipe engine:
//! global G-code output settings, per-extruder retraction/wipe settings and
//! per-region retraction overrides.

mod print_config;
mod region_config;

pub use print_config::{ExtruderConfig, FloatOrPercent, PrintConfig};
pub use region_config::PrintRegionConfig;
