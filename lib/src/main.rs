//! Wipe CLI - Command-line interface for the wipe library
//!
//! Usage:
//!   wipe-cli wipe <scenario.json> [-o <output.gcode>] [--toolchange]
//!   wipe-cli hide-seam <scenario.json> --wipe-length 2.0 [--hole]
//!   wipe-cli info <scenario.json>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use serde::Deserialize;
use slicer_wipe::{
    wipe_hide_seam, ExtrusionPaths, GCodeGenerator, Point, Point3F, PointF, PrintConfig,
    PrintRegionConfig, Wipe,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Wipe-path generation for retraction moves
#[derive(Parser, Debug)]
#[command(name = "wipe-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the wipe and retraction G-code for a scenario
    Wipe {
        /// Scenario file (JSON format)
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        /// Output G-code file (stdout if omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Retract for a tool change
        #[arg(long)]
        toolchange: bool,

        /// Only emit the wipe, without the in-place retraction of the remainder
        #[arg(long)]
        wipe_only: bool,
    },

    /// Compute the seam-hiding point of a closed loop
    HideSeam {
        /// Scenario file (JSON format)
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        /// Wipe length in mm
        #[arg(short, long, default_value = "1.0")]
        wipe_length: f64,

        /// The loop is a hole (clockwise)
        #[arg(long)]
        hole: bool,
    },

    /// Show information about a scenario
    Info {
        /// Scenario file (JSON format)
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,
    },
}

/// Everything needed to replay one wipe.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct Scenario {
    config: PrintConfig,
    /// Extruders in use; the first one is active.
    extruders: Vec<usize>,
    region: Option<PrintRegionConfig>,
    origin: PointF,
    /// Position where extrusion stopped, in object coordinates (scaled).
    last_pos: Point,
    /// Current nozzle height (mm).
    z: f64,
    offset: Point,
    /// Walk the paths backwards.
    reversed: bool,
    paths: ExtrusionPaths,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            config: PrintConfig::default(),
            extruders: vec![0],
            region: None,
            origin: PointF::zero(),
            last_pos: Point::zero(),
            z: 0.2,
            offset: Point::zero(),
            reversed: true,
            paths: ExtrusionPaths::new(),
        }
    }
}

impl Scenario {
    fn load(path: &Path) -> Result<Self> {
        info!("Loading scenario from: {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let scenario: Self =
            serde_json::from_str(&content).context("Failed to parse scenario")?;
        scenario.config.validate()?;
        if scenario.extruders.is_empty() {
            bail!("scenario lists no extruders");
        }
        Ok(scenario)
    }

    fn generator(&self) -> GCodeGenerator {
        let mut gen = GCodeGenerator::new(self.config.clone(), &self.extruders);
        gen.set_region(self.region.clone());
        gen.set_origin(self.origin);
        gen.set_last_pos(self.last_pos);
        let start = gen.point_to_gcode(self.last_pos);
        gen.writer_mut()
            .set_position(Point3F::from_xy(start, self.z));
        gen
    }

    fn total_length(&self) -> f64 {
        self.paths.iter().map(|p| p.length()).sum()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Wipe {
            scenario,
            output,
            toolchange,
            wipe_only,
        } => cmd_wipe(scenario, output, toolchange, wipe_only),
        Commands::HideSeam {
            scenario,
            wipe_length,
            hole,
        } => cmd_hide_seam(scenario, wipe_length, hole),
        Commands::Info { scenario } => cmd_info(scenario),
    }
}

fn cmd_wipe(
    scenario: PathBuf,
    output: Option<PathBuf>,
    toolchange: bool,
    wipe_only: bool,
) -> Result<()> {
    let scenario = Scenario::load(&scenario)?;
    let mut gen = scenario.generator();

    let mut wipe = Wipe::new();
    wipe.init(gen.config(), &scenario.extruders);
    if !wipe.is_enabled() {
        warn!("No extruder has wiping enabled");
    }
    wipe.set_offset(scenario.offset);
    wipe.set_path(&scenario.paths, scenario.reversed);
    info!(
        "Wipe path: {} vertices (max length {:.3} mm)",
        wipe.path().len(),
        wipe.max_length()
    );

    let gcode = if wipe_only {
        wipe.wipe(&mut gen, toolchange)
    } else {
        gen.retract_and_wipe(&mut wipe, toolchange)
    };
    let end = gen.point_to_gcode(gen.last_pos());
    info!("Stopped at ({:.3}, {:.3})", end.x, end.y);

    match output {
        Some(path) => {
            fs::write(&path, &gcode)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("G-code written to: {}", path.display());
        }
        None => print!("{}", gcode),
    }

    Ok(())
}

fn cmd_hide_seam(scenario: PathBuf, wipe_length: f64, hole: bool) -> Result<()> {
    if wipe_length <= 0.0 {
        bail!("wipe length must be positive");
    }
    let scenario = Scenario::load(&scenario)?;
    let gen = scenario.generator();

    match wipe_hide_seam(&scenario.paths, hole, wipe_length) {
        Some(p) => {
            let g = gen.point_to_gcode(p);
            println!("Seam hiding point: ({:.3}, {:.3}) mm", g.x, g.y);
        }
        None => println!(
            "No seam hiding point: loop of {:.3} mm is too short for {:.3} mm",
            scenario.total_length(),
            wipe_length
        ),
    }

    Ok(())
}

fn cmd_info(scenario: PathBuf) -> Result<()> {
    let scenario = Scenario::load(&scenario)?;
    let config = &scenario.config;

    let mut wipe = Wipe::new();
    wipe.init(config, &scenario.extruders);

    println!("Scenario Information:");
    println!("  Config: {}", config);
    if let Some(region) = &scenario.region {
        println!("  Region: {}", region);
    }
    println!("  Extruders:");
    for &id in &scenario.extruders {
        match config.extruder(id) {
            Some(extruder) => {
                let speed = Wipe::calc_wipe_speed(config, id);
                println!(
                    "    T{}: retract {:.3} mm, wipe {}, speed {:.1} mm/s ({}), ratio {:.5}",
                    id,
                    extruder.retract_length,
                    if extruder.wipe { "on" } else { "off" },
                    speed.speed,
                    if speed.explicit { "explicit" } else { "travel" },
                    Wipe::calc_xy_to_e_ratio(config, id)
                );
            }
            None => println!("    T{}: not configured", id),
        }
    }
    if wipe.is_enabled() {
        println!("  Max wipe length: {:.3} mm", wipe.max_length());
    } else {
        println!("  Wipe: disabled");
    }
    println!("  Paths: {}", scenario.paths.len());
    for (i, path) in scenario.paths.iter().enumerate() {
        println!(
            "    #{}: {} ({} vertices, {:.3} mm{})",
            i,
            path.role.name(),
            path.size(),
            path.length(),
            if path.as_polyline().has_arcs() {
                ", arcs"
            } else {
                ""
            }
        );
    }
    println!("  Total length: {:.3} mm", scenario.total_length());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scenario_defaults() {
        let scenario: Scenario = serde_json::from_str("{}").unwrap();
        assert_eq!(scenario.extruders, vec![0]);
        assert!(scenario.reversed);
        assert!(scenario.paths.is_empty());
    }

    #[test]
    fn test_scenario_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        fs::write(
            &path,
            r#"{
                "last_pos": { "x": 10000000, "y": 0 },
                "paths": [{
                    "polyline": { "vertices": [
                        { "point": { "x": 0, "y": 0 } },
                        { "point": { "x": 10000000, "y": 0 } }
                    ] },
                    "role": "external_perimeter"
                }]
            }"#,
        )
        .unwrap();
        let scenario = Scenario::load(&path).unwrap();
        assert!((scenario.total_length() - 10.0).abs() < 1e-9);
        let gen = scenario.generator();
        assert!((gen.writer().get_position().x - 10.0).abs() < 1e-9);

        fs::write(&path, r#"{ "extruders": [] }"#).unwrap();
        assert!(Scenario::load(&path).is_err());
    }
}
