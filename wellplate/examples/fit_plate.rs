//! Example: Plate calibration from recorded stage positions
//!
//! Reads a measurement file, fits the plate-to-stage transform, prints the fit
//! and the verification positions of the last well, and optionally saves the
//! calibration record.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example fit_plate -- measurements.yaml [calibration.json]
//! ```
//!
//! Measurement file (YAML or JSON):
//!
//! ```yaml
//! plate: 96-well
//! config:
//!   scale_model: uniform
//! wells:
//!   - well: A1
//!     points: [[1000.0, 1500.0]]
//!   - well: H12
//!     mode: five-point
//!     points: [[100000, 64500], [96800, 64500], [103200, 64500], [100000, 61300], [100000, 67700]]
//! ```

use std::env;
use std::path::Path;

use anyhow::{bail, Context, Result};
use glam::DVec2;
use serde::Deserialize;
use wellplate::{
    test_positions, CalibrationConfig, CalibrationSession, CenterMode, PlateCatalog, WellIndex,
};

#[derive(Debug, Deserialize)]
struct Measurements {
    plate: String,
    #[serde(default)]
    config: CalibrationConfig,
    wells: Vec<WellMeasurement>,
}

#[derive(Debug, Deserialize)]
struct WellMeasurement {
    well: String,
    #[serde(default)]
    mode: CenterMode,
    points: Vec<DVec2>,
}

fn main() -> Result<()> {
    let _logger = common::setup_logging("info")?;

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <measurements> [output]", args[0]);
        std::process::exit(1);
    }

    let measurements: Measurements = common::serde::read_file(Path::new(&args[1]))?;
    let catalog = PlateCatalog::builtin();
    let Some(geometry) = catalog.get(&measurements.plate) else {
        bail!(
            "Unknown plate '{}', expected one of: {}",
            measurements.plate,
            catalog.ids().collect::<Vec<_>>().join(", ")
        );
    };

    measurements
        .config
        .check()
        .with_context(|| format!("Invalid config in {}", args[1]))?;
    let mut session = CalibrationSession::new(*geometry, measurements.config)?;
    let mut last_well = WellIndex::A1;
    for measurement in &measurements.wells {
        let well: WellIndex = measurement
            .well
            .parse()
            .with_context(|| format!("Bad well name '{}'", measurement.well))?;
        session.set_mode(well, measurement.mode)?;
        for point in &measurement.points {
            session.add_point(well, *point)?;
        }
        match session.well(well).and_then(|w| w.center()) {
            Some(center) => println!("{well}: center ({:.2}, {:.2})", center.x, center.y),
            None => println!("{well}: incomplete"),
        }
        last_well = well;
    }

    let fit = session.fit()?.clone();
    println!("\n{}", fit.transform);
    println!(
        "  {} wells, RMS {:.3} µm, max {:.3} µm, pitch deviation {:.3}%",
        fit.num_points,
        fit.residual,
        fit.max_residual,
        fit.pitch_deviation() * 100.0
    );

    println!("\nVerification positions for {last_well}:");
    for p in test_positions::test_positions(&fit.transform, geometry, last_well)? {
        println!("  ({:.2}, {:.2})", p.x, p.y);
    }

    if let Some(output) = args.get(2) {
        let calibration = session.commit()?;
        calibration.save(Path::new(output))?;
        println!("\nSaved calibration to {output}");
    }

    Ok(())
}
