//! Calibration configuration.

use std::path::Path;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Which pitch correction the plate fit solves for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ScaleModel {
    /// Rotation + translation, scale held at (1, 1).
    #[default]
    Fixed,
    /// Rotation + translation + one isotropic scale factor.
    Uniform,
    /// Rotation + translation + independent x/y scale. Needs 3 points.
    PerAxis,
}

impl ScaleModel {
    /// Minimum number of correspondences for a plate fit.
    pub fn min_points(&self) -> usize {
        match self {
            ScaleModel::Fixed | ScaleModel::Uniform => 2,
            ScaleModel::PerAxis => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub scale_model: ScaleModel,
    /// Relative tolerance of the collinearity test, compared against
    /// `|u × v| / (|u| |v|)` of deviation vectors.
    pub collinearity_tolerance: f64,
    /// Wells a session needs before it attempts a plate fit.
    pub min_calibrated_wells: usize,
    /// Fitted pitch deviating from nominal by more than this fraction is logged as a warning.
    pub pitch_warning_fraction: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            scale_model: ScaleModel::Fixed,
            collinearity_tolerance: 1e-9,
            min_calibrated_wells: 2,
            pitch_warning_fraction: 0.05,
        }
    }
}

impl CalibrationConfig {
    /// Validate configuration parameters.
    ///
    /// # Panics
    /// Panics on an invalid configuration; use [`CalibrationConfig::check`] for
    /// configurations read from outside the program.
    pub fn validate(&self) {
        if let Err(e) = self.check() {
            panic!("{}", e);
        }
    }

    pub fn check(&self) -> anyhow::Result<()> {
        ensure!(
            self.collinearity_tolerance >= 0.0 && self.collinearity_tolerance < 1.0,
            "collinearity_tolerance must be in [0, 1), got {}",
            self.collinearity_tolerance
        );
        ensure!(
            self.min_calibrated_wells >= 2,
            "min_calibrated_wells must be at least 2, got {}",
            self.min_calibrated_wells
        );
        ensure!(
            self.pitch_warning_fraction > 0.0,
            "pitch_warning_fraction must be positive, got {}",
            self.pitch_warning_fraction
        );
        Ok(())
    }

    /// Loads a config from YAML or JSON, chosen by file extension.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: Self = common::serde::read_file(path)?;
        config
            .check()
            .with_context(|| format!("Invalid calibration config in {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        common::serde::write_file(path, self)
    }
}
