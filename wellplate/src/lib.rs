//! Well-plate calibration for a motorized microscope stage.
//!
//! The operator centers the stage on a few wells (one or several clicks per
//! well, see [`well_center`]). The resulting well-center correspondences fit a
//! plate-to-stage [`PlaneTransform`] ([`solver`]), which then maps every well
//! and in-well offset to stage coordinates and back ([`mapper`]).
//!
//! All distances are in stage units (µm); angles are radians,
//! counter-clockwise positive.

pub mod catalog;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mapper;
pub mod session;
pub mod solver;
pub mod test_positions;
pub mod transform;
pub mod well_center;

pub use catalog::PlateCatalog;
pub use config::{CalibrationConfig, ScaleModel};
pub use error::{CalibrationError, Result};
pub use geometry::{PlateGeometry, WellIndex};
pub use mapper::{CoordinateMapper, WellLocation};
pub use session::{CalibrationSession, PlateCalibration};
pub use solver::{CalibrationPoint, PlateFit, PlateTransformSolver};
pub use transform::PlaneTransform;
pub use well_center::{CenterMode, WellCalibrationResult};
