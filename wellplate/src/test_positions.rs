//! Verification points for a fitted calibration.
//!
//! Each point is a plate-frame offset from the well center pushed through the
//! full transform, so scale and rotation shape the pattern the same way they
//! shape the plate.

use glam::DVec2;

use crate::error::Result;
use crate::geometry::{PlateGeometry, WellIndex};
use crate::mapper;
use crate::transform::PlaneTransform;

/// Plate-frame offsets of the verification pattern, center first.
///
/// Circular wells: center, then the circumference at +x, +y, -x, -y.
/// Rectangular wells: center, then corners counter-clockwise from (+x, +y).
pub fn pattern_offsets(geometry: &PlateGeometry) -> [DVec2; 5] {
    let half = geometry.well_size * 0.5;
    if geometry.circular {
        let r = half.x;
        [
            DVec2::ZERO,
            DVec2::new(r, 0.0),
            DVec2::new(0.0, r),
            DVec2::new(-r, 0.0),
            DVec2::new(0.0, -r),
        ]
    } else {
        [
            DVec2::ZERO,
            DVec2::new(half.x, half.y),
            DVec2::new(-half.x, half.y),
            DVec2::new(-half.x, -half.y),
            DVec2::new(half.x, -half.y),
        ]
    }
}

/// Stage positions of the verification pattern for `well`. Element 0 is the center.
pub fn test_positions(
    transform: &PlaneTransform,
    geometry: &PlateGeometry,
    well: WellIndex,
) -> Result<Vec<DVec2>> {
    pattern_offsets(geometry)
        .into_iter()
        .map(|offset| mapper::to_stage(transform, geometry, well, offset))
        .collect()
}

/// Stage position of the well boundary in plate-frame direction `angle` (radians).
pub fn edge_point(
    transform: &PlaneTransform,
    geometry: &PlateGeometry,
    well: WellIndex,
    angle: f64,
) -> Result<DVec2> {
    let direction = DVec2::from_angle(angle);
    let half = geometry.well_size * 0.5;
    let offset = if geometry.circular {
        direction * half.x
    } else {
        // Ray from the center hits whichever side it reaches first.
        let tx = if direction.x != 0.0 {
            half.x / direction.x.abs()
        } else {
            f64::INFINITY
        };
        let ty = if direction.y != 0.0 {
            half.y / direction.y.abs()
        } else {
            f64::INFINITY
        };
        direction * tx.min(ty)
    };
    mapper::to_stage(transform, geometry, well, offset)
}
