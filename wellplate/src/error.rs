//! Calibration error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::WellIndex;
use crate::well_center::CenterMode;

/// Validation failures of the calibration core.
///
/// Every variant is a deterministic consequence of caller-supplied data and
/// is recoverable by supplying more or different points.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalibrationError {
    #[error("Calibration mode {mode} needs {expected} points, got {found}")]
    InvalidPointCount {
        mode: CenterMode,
        expected: usize,
        found: usize,
    },
    #[error("Plate fit needs at least {required} calibration points, got {found}")]
    InsufficientPoints { found: usize, required: usize },
    #[error("Calibration points are collinear, rotation is undetermined")]
    CollinearPoints,
    #[error("Transform has not been fitted from calibration points")]
    UntransformedState,
    #[error("Well {well} is outside the {rows}x{columns} plate")]
    WellOutOfRange {
        well: WellIndex,
        rows: usize,
        columns: usize,
    },
    #[error("Invalid plate geometry: {0}")]
    InvalidGeometry(String),
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
