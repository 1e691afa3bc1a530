//! End-to-end wipe tests.
//!
//! These tests drive the generator the way a print pass does:
//! - Store the tail of a printed loop for wiping
//! - Retract with a wipe, then retract the remainder in place
//! - Hide the seam of a closed loop

use slicer_wipe::{
    sample_path_point_at_distance_from_end, sample_path_point_at_distance_from_start,
    wipe_hide_seam, ExtruderConfig, ExtrusionPath, ExtrusionPaths, ExtrusionRole,
    GCodeGenerator, Point, PrintConfig, Wipe,
};

fn path(points: &[(f64, f64)], role: ExtrusionRole) -> ExtrusionPath {
    let points: Vec<Point> = points
        .iter()
        .map(|&(x, y)| Point::new_scale(x, y))
        .collect();
    ExtrusionPath::from_points(&points, role)
}

/// Counter-clockwise square of side 10, one path per side.
fn square_loop() -> ExtrusionPaths {
    vec![
        path(&[(0.0, 0.0), (10.0, 0.0)], ExtrusionRole::ExternalPerimeter),
        path(&[(10.0, 0.0), (10.0, 10.0)], ExtrusionRole::ExternalPerimeter),
        path(&[(10.0, 10.0), (0.0, 10.0)], ExtrusionRole::ExternalPerimeter),
        path(&[(0.0, 10.0), (0.0, 0.0)], ExtrusionRole::ExternalPerimeter),
    ]
}

/// Sum of the E words of every line.
fn total_e(gcode: &str) -> f64 {
    gcode
        .lines()
        .flat_map(|line| line.split_whitespace())
        .filter_map(|word| word.strip_prefix('E'))
        .filter_map(|v| v.parse::<f64>().ok())
        .sum()
}

fn generator(config: PrintConfig, extruders: &[usize]) -> (GCodeGenerator, Wipe) {
    let gen = GCodeGenerator::new(config, extruders);
    let mut wipe = Wipe::new();
    wipe.init(gen.config(), extruders);
    (gen, wipe)
}

/// Test wiping back along a finished perimeter loop
#[test]
fn test_wipe_back_along_loop() {
    let (mut gen, mut wipe) = generator(PrintConfig::default(), &[0]);
    let paths = square_loop();
    gen.set_last_pos(Point::new_scale(0.0, 0.0));

    wipe.set_path(&paths, true);
    // 0.8mm at 0.95 * 40 / 96 per mm needs about 2mm, one side is enough.
    assert_eq!(wipe.path().len(), 2);

    let gcode = gen.retract_and_wipe(&mut wipe, false);
    assert!(gcode.contains("G1 X0.000 Y2.021 E-0.80000\n"));
    assert!((total_e(&gcode) + 0.8).abs() < 1e-9);
    assert_eq!(gen.last_pos(), Point::new_scale(0.0, 2.021));

    // Nothing left to wipe or retract.
    assert_eq!(gen.retract_and_wipe(&mut wipe, false), "");
}

/// Test a tool change retraction spanning several paths
#[test]
fn test_toolchange_wipe_spans_paths() {
    let config = PrintConfig::default().extruders(vec![
        ExtruderConfig::default().retract_length_toolchange(6.0),
        ExtruderConfig::default(),
    ]);
    let (mut gen, mut wipe) = generator(config, &[0, 1]);
    gen.set_last_pos(Point::new_scale(0.0, 0.0));

    wipe.set_path(&square_loop(), true);
    // 6mm needs more than 15mm of travel.
    assert_eq!(wipe.path().len(), 3);

    let gcode = wipe.wipe(&mut gen, true);
    assert_eq!(gcode.matches("G1 X").count(), 2);
    assert!(gcode.contains("G1 X0.000 Y10.000 E-3.95833\n"));
    assert!((total_e(&gcode) + 6.0).abs() < 1e-9);
    let tool = gen.writer().tool().unwrap();
    assert!((tool.retracted() - 6.0).abs() < 1e-9);
}

/// Test that a short path leaves the rest to a plain retraction
#[test]
fn test_short_path_then_retract() {
    let (mut gen, mut wipe) = generator(PrintConfig::default(), &[0]);
    gen.set_last_pos(Point::new_scale(1.0, 0.0));
    wipe.set_path(
        &[path(&[(0.0, 0.0), (1.0, 0.0)], ExtrusionRole::Perimeter)],
        true,
    );

    let gcode = gen.retract_and_wipe(&mut wipe, false);
    let (wiped, retracted) = gcode
        .split_once(";WIPE_END\n")
        .expect("wipe block expected");
    assert!((total_e(wiped) + 0.39583).abs() < 1e-9);
    assert!((total_e(retracted) + 0.40417).abs() < 1e-9);
    assert!((total_e(&gcode) + 0.8).abs() < 1e-9);
}

/// Test that the wipe never reuses a bridge
#[test]
fn test_wipe_stops_before_bridge() {
    let (mut gen, mut wipe) = generator(PrintConfig::default(), &[0]);
    let paths = vec![
        path(&[(0.0, 0.0), (0.5, 0.0)], ExtrusionRole::ExternalPerimeter),
        path(&[(0.5, 0.0), (5.0, 0.0)], ExtrusionRole::BridgeInfill),
    ];
    wipe.set_path(&paths, false);
    assert_eq!(wipe.path().len(), 2);

    let gcode = wipe.wipe(&mut gen, false);
    assert!(gcode.contains("G1 X0.500 Y0.000 E-0.19792\n"));
    assert_eq!(gen.last_pos(), Point::new_scale(0.5, 0.0));
}

/// Test that the retraction used never exceeds the request
#[test]
fn test_wipe_retraction_budget() {
    // Ratio 0.03.
    let ratio = 0.03;
    for retract_length in [0.1, 0.45, 1.2, 2.0] {
        for length in [0.5, 3.0, 10.0, 50.0, 120.0] {
            let extruder = ExtruderConfig::default()
                .retract_length(retract_length)
                .retract_speed(30.0)
                .wipe_speed(950.0);
            let config = PrintConfig::default().extruders(vec![extruder]);
            let (mut gen, mut wipe) = generator(config, &[0]);
            wipe.set_path(
                &[path(&[(0.0, 0.0), (length, 0.0)], ExtrusionRole::Perimeter)],
                false,
            );

            let used = -total_e(&wipe.wipe(&mut gen, false));
            assert!(used <= retract_length + 1e-9, "{} > {}", used, retract_length);
            if length * ratio >= retract_length {
                assert!((used - retract_length).abs() < 1e-9);
            } else {
                assert!(used < retract_length);
            }
        }
    }
}

/// Test a wipe over an arc read from JSON
#[test]
fn test_wipe_over_json_arc() {
    let json = r#"[{
        "polyline": { "vertices": [
            { "point": { "x": 0, "y": 0 } },
            { "point": { "x": 10000000, "y": 0 },
              "kind": { "Arc": { "radius": 5000000, "direction": "CounterClockwise" } } },
            { "point": { "x": 10000000, "y": 10000000 } }
        ] },
        "role": "external_perimeter"
    }]"#;
    let paths: ExtrusionPaths = serde_json::from_str(json).unwrap();
    assert!((paths[0].length() - (10.0 + 5.0 * std::f64::consts::PI)).abs() < 1e-6);

    let extruder = ExtruderConfig::default()
        .retract_length(1.0)
        .retract_speed(30.0)
        .wipe_speed(950.0);
    let config = PrintConfig::default().extruders(vec![extruder]);
    let (mut gen, mut wipe) = generator(config, &[0]);
    gen.set_last_pos(Point::new_scale(10.0, 10.0));
    wipe.set_path(&paths, true);

    let gcode = wipe.wipe(&mut gen, false);
    // The half circle is walked clockwise, then the straight part runs out
    // before the retraction does.
    assert!(gcode.contains("G2 X10.000 Y0.000 I0.000 J-5.000 E-0.47124\n"));
    assert!(gcode.contains("G1 X0.000 Y0.000 E-0.30000\n"));
    assert!((total_e(&gcode) + 0.77124).abs() < 1e-9);
}

/// Test seam hiding together with the sampling it relies on
#[test]
fn test_hide_seam_on_loop() {
    let paths = square_loop();
    for d in [0.0, 2.5, 10.0, 17.5, 33.0, 40.0] {
        let a = sample_path_point_at_distance_from_start(&paths, d).unwrap();
        let b = sample_path_point_at_distance_from_end(&paths, 40.0 - d).unwrap();
        assert!(a.to_f64().approx_eq(&b.to_f64(), 1e-5));
    }

    let hide = wipe_hide_seam(&paths, false, 2.0).unwrap().to_f64();
    assert!((hide.length() - 2.0).abs() < 1e-5);
    let angle = hide.y.atan2(hide.x).to_degrees();
    assert!((angle - 30.0).abs() < 1e-3);

    assert_eq!(wipe_hide_seam(&paths, false, 16.0), None);
}
