//! Calibration session state: per-well measurements and the plate fit derived
//! from them.
//!
//! The session owns the mutable point set. Every mutation bumps a revision
//! counter; the cached fit remembers the revision it was computed from and is
//! recomputed on the next [`CalibrationSession::fit`] if they differ, so a
//! stale fit is never handed out.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use glam::DVec2;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;
use crate::error::{CalibrationError, Result};
use crate::geometry::{PlateGeometry, WellIndex};
use crate::mapper::CoordinateMapper;
use crate::solver::{CalibrationPoint, PlateFit, PlateTransformSolver};
use crate::well_center::{CenterMode, WellCalibrationResult};

/// Refits closer than this to the previous transform are not reported.
const UNCHANGED_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
struct CachedFit {
    revision: u64,
    fit: Result<PlateFit>,
}

#[derive(Debug, Clone)]
pub struct CalibrationSession {
    geometry: PlateGeometry,
    solver: PlateTransformSolver,
    wells: BTreeMap<WellIndex, WellCalibrationResult>,
    revision: u64,
    cached: Option<CachedFit>,
}

impl CalibrationSession {
    pub fn new(geometry: PlateGeometry, config: CalibrationConfig) -> Result<Self> {
        geometry.validate()?;
        Ok(Self {
            geometry,
            solver: PlateTransformSolver::new(config),
            wells: BTreeMap::new(),
            revision: 0,
            cached: None,
        })
    }

    pub fn geometry(&self) -> &PlateGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &CalibrationConfig {
        self.solver.config()
    }

    /// Incremented on every change to the recorded points.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn well(&self, well: WellIndex) -> Option<&WellCalibrationResult> {
        self.wells.get(&well)
    }

    /// Wells that have a center, in row-major order.
    pub fn calibrated_wells(&self) -> impl Iterator<Item = WellIndex> + '_ {
        self.wells
            .iter()
            .filter(|(_, result)| result.is_calibrated())
            .map(|(well, _)| *well)
    }

    /// Well-center correspondences for the plate fit.
    pub fn calibration_points(&self) -> Vec<CalibrationPoint> {
        self.wells
            .iter()
            .filter_map(|(well, result)| {
                result
                    .center()
                    .map(|center| CalibrationPoint::new(*well, center))
            })
            .collect()
    }

    fn entry(&mut self, well: WellIndex) -> Result<&mut WellCalibrationResult> {
        self.geometry.check_well(well)?;
        Ok(self.wells.entry(well).or_default())
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn set_mode(&mut self, well: WellIndex, mode: CenterMode) -> Result<()> {
        let result = self.entry(well)?;
        if result.mode() != mode {
            result.set_mode(mode);
            self.touch();
        }
        Ok(())
    }

    /// Records the next stage position for `well`; returns its center once complete.
    pub fn add_point(&mut self, well: WellIndex, stage: DVec2) -> Result<Option<DVec2>> {
        let result = self.entry(well)?;
        let outcome = result.push(stage);
        if outcome.is_ok() {
            self.touch();
        }
        if let Ok(Some(center)) = outcome {
            debug!("well {} calibrated at ({:.2}, {:.2})", well, center.x, center.y);
        }
        outcome
    }

    /// Replaces a recorded stage position of `well`.
    ///
    /// # Panics
    /// Panics if `well` has no point at `index`.
    pub fn replace_point(
        &mut self,
        well: WellIndex,
        index: usize,
        stage: DVec2,
    ) -> Result<Option<DVec2>> {
        let result = self.entry(well)?;
        let outcome = result.replace(index, stage);
        // The point was stored even if the center could not be refit.
        self.touch();
        outcome
    }

    pub fn clear_well(&mut self, well: WellIndex) {
        if self.wells.remove(&well).is_some() {
            self.touch();
        }
    }

    pub fn clear(&mut self) {
        if !self.wells.is_empty() {
            self.wells.clear();
            self.touch();
        }
    }

    /// The plate fit for the current points, recomputed if the points changed.
    pub fn fit(&mut self) -> Result<&PlateFit> {
        let stale = self
            .cached
            .as_ref()
            .is_none_or(|cached| cached.revision != self.revision);
        if stale {
            let previous = match self.cached.as_ref().map(|cached| &cached.fit) {
                Some(Ok(fit)) => Some(fit.transform),
                _ => None,
            };
            let fit = self.compute_fit();
            match &fit {
                Ok(fit)
                    if previous
                        .is_some_and(|t| t.approx_eq(&fit.transform, UNCHANGED_TOLERANCE)) =>
                {
                    debug!("plate fit unchanged, rms {:.3}", fit.residual)
                }
                Ok(fit) => info!(
                    "plate calibrated from {} wells: {}, rms {:.3}",
                    fit.num_points, fit.transform, fit.residual
                ),
                Err(e) => debug!("plate not calibrated: {}", e),
            }
            self.cached = Some(CachedFit {
                revision: self.revision,
                fit,
            });
        }

        match self.cached.as_ref().map(|cached| &cached.fit) {
            Some(Ok(fit)) => Ok(fit),
            Some(Err(e)) => Err(e.clone()),
            None => Err(CalibrationError::UntransformedState),
        }
    }

    fn compute_fit(&self) -> Result<PlateFit> {
        let points = self.calibration_points();
        let required = self.config().min_calibrated_wells;
        if points.len() < required {
            return Err(CalibrationError::InsufficientPoints {
                found: points.len(),
                required,
            });
        }
        self.solver.fit(&points, &self.geometry)
    }

    pub fn is_calibrated(&mut self) -> bool {
        self.fit().is_ok()
    }

    pub fn mapper(&mut self) -> Result<CoordinateMapper> {
        let transform = self.fit()?.transform;
        CoordinateMapper::new(transform, self.geometry)
    }

    /// Freezes the current fit into a record for the navigation layer.
    pub fn commit(&mut self) -> Result<PlateCalibration> {
        let fit = self.fit()?.clone();
        Ok(PlateCalibration {
            geometry: self.geometry,
            fit,
        })
    }
}

/// A committed calibration: the plate it applies to and its fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateCalibration {
    pub geometry: PlateGeometry,
    pub fit: PlateFit,
}

impl PlateCalibration {
    pub fn mapper(&self) -> Result<CoordinateMapper> {
        CoordinateMapper::new(self.fit.transform, self.geometry)
    }

    /// Writes YAML or JSON, chosen by file extension.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        common::serde::write_file(path, self)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let calibration: Self = common::serde::read_file(path)?;
        calibration
            .geometry
            .validate()
            .with_context(|| format!("Invalid plate in {}", path.display()))?;
        Ok(calibration)
    }
}
