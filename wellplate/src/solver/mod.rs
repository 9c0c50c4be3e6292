//! Plate-to-stage transform fitting from well correspondences.
//!
//! Two correspondences are solved in closed form; three or more go through a
//! least-squares Procrustes fit (or a per-axis fit when pitch is corrected per
//! axis). The fit is independent of input order: points are sorted into a
//! canonical order first.

use std::cmp::Ordering;

use glam::DVec2;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{CalibrationConfig, ScaleModel};
use crate::error::{CalibrationError, Result};
use crate::geometry::{PlateGeometry, WellIndex};
use crate::transform::PlaneTransform;

mod estimate;


/// A measured pairing of a plate location and its stage position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub well: WellIndex,
    /// Offset from the well center in the plate frame, zero for a well center.
    #[serde(default)]
    pub offset: DVec2,
    pub stage: DVec2,
}

impl CalibrationPoint {
    pub fn new(well: WellIndex, stage: DVec2) -> Self {
        Self {
            well,
            offset: DVec2::ZERO,
            stage,
        }
    }

    pub fn with_offset(mut self, offset: DVec2) -> Self {
        self.offset = offset;
        self
    }

    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.well
            .cmp(&other.well)
            .then(self.offset.x.total_cmp(&other.offset.x))
            .then(self.offset.y.total_cmp(&other.offset.y))
            .then(self.stage.x.total_cmp(&other.stage.x))
            .then(self.stage.y.total_cmp(&other.stage.y))
    }
}

/// Result of a plate fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateFit {
    pub transform: PlaneTransform,
    /// RMS distance between fitted and measured positions, stage units.
    pub residual: f64,
    pub max_residual: f64,
    /// Per-point residuals in canonical point order.
    pub residuals: Vec<f64>,
    pub num_points: usize,
}

impl PlateFit {
    pub fn is_valid(&self) -> bool {
        self.transform.is_valid()
    }

    /// Largest relative deviation of the fitted pitch from the nominal pitch.
    pub fn pitch_deviation(&self) -> f64 {
        let s = self.transform.scale;
        (s.x - 1.0).abs().max((s.y - 1.0).abs())
    }

    /// Center-to-center distance between wells as measured on the stage.
    pub fn fitted_spacing(&self, geometry: &PlateGeometry) -> DVec2 {
        geometry.well_spacing * self.transform.scale
    }
}

/// Stateless plate fitting service.
#[derive(Debug, Clone, Default)]
pub struct PlateTransformSolver {
    config: CalibrationConfig,
}

impl PlateTransformSolver {
    pub fn new(config: CalibrationConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Fits the plate-to-stage transform from well correspondences.
    ///
    /// Fails with [`CalibrationError::InsufficientPoints`] below the scale
    /// model's minimum, and with [`CalibrationError::CollinearPoints`] when the
    /// point set cannot determine a rotation.
    ///
    /// Two points fit exactly only with [`ScaleModel::Uniform`]. With a fixed
    /// scale the translation anchors the midpoints, splitting any length
    /// mismatch evenly between the two points.
    pub fn fit(&self, points: &[CalibrationPoint], geometry: &PlateGeometry) -> Result<PlateFit> {
        let scale_model = self.config.scale_model;
        let required = scale_model.min_points();
        if points.len() < required {
            return Err(CalibrationError::InsufficientPoints {
                found: points.len(),
                required,
            });
        }
        for point in points {
            geometry.check_well(point.well)?;
        }

        let mut sorted = points.to_vec();
        sorted.sort_by(CalibrationPoint::canonical_cmp);

        let plate: Vec<DVec2> = sorted
            .iter()
            .map(|p| geometry.nominal_position(p.well, p.offset))
            .collect();
        let stage: Vec<DVec2> = sorted.iter().map(|p| p.stage).collect();

        self.check_degenerate(&plate, &stage)?;

        let transform = match (plate.len(), scale_model) {
            (2, ScaleModel::Fixed | ScaleModel::Uniform) => estimate::estimate_two_point(
                [plate[0], plate[1]],
                [stage[0], stage[1]],
                scale_model == ScaleModel::Uniform,
            ),
            (_, ScaleModel::Fixed) => estimate::estimate_procrustes(&plate, &stage, false)
                .ok_or(CalibrationError::CollinearPoints)?,
            (_, ScaleModel::Uniform) => estimate::estimate_procrustes(&plate, &stage, true)
                .ok_or(CalibrationError::CollinearPoints)?,
            (_, ScaleModel::PerAxis) => estimate::estimate_per_axis(&plate, &stage)
                .ok_or(CalibrationError::CollinearPoints)?,
        };

        let fit = build_fit(transform, &plate, &stage)?;

        debug!(
            "plate fit from {} points ({}): {}, rms {:.3}, max {:.3}",
            fit.num_points, scale_model, fit.transform, fit.residual, fit.max_residual
        );
        if fit.pitch_deviation() > self.config.pitch_warning_fraction {
            let spacing = fit.fitted_spacing(geometry);
            warn!(
                "fitted well spacing ({:.2}, {:.2}) deviates from nominal ({:.2}, {:.2}) by {:.1}%",
                spacing.x,
                spacing.y,
                geometry.well_spacing.x,
                geometry.well_spacing.y,
                fit.pitch_deviation() * 100.0
            );
        }

        Ok(fit)
    }

    fn check_degenerate(&self, plate: &[DVec2], stage: &[DVec2]) -> Result<()> {
        let tolerance = self.config.collinearity_tolerance;

        if estimate::is_coincident(plate, tolerance) || estimate::is_coincident(stage, tolerance) {
            return Err(CalibrationError::CollinearPoints);
        }
        if plate.len() < 3 {
            return Ok(());
        }

        let plate_collinear = estimate::is_collinear(plate, tolerance);
        if plate_collinear && self.config.scale_model == ScaleModel::PerAxis {
            return Err(CalibrationError::CollinearPoints);
        }
        if plate_collinear && estimate::is_collinear(stage, tolerance) {
            return Err(CalibrationError::CollinearPoints);
        }
        Ok(())
    }
}

fn build_fit(transform: PlaneTransform, plate: &[DVec2], stage: &[DVec2]) -> Result<PlateFit> {
    let residuals = plate
        .iter()
        .zip(stage.iter())
        .map(|(p, s)| Ok((transform.apply(*p)? - *s).length()))
        .collect::<Result<Vec<f64>>>()?;

    let sum_sq: f64 = residuals.iter().map(|r| r * r).sum();
    let residual = (sum_sq / residuals.len() as f64).sqrt();
    let max_residual = residuals.iter().copied().fold(0.0, f64::max);

    Ok(PlateFit {
        transform,
        residual,
        max_residual,
        num_points: residuals.len(),
        residuals,
    })
}
