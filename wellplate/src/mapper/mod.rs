//! Conversion between plate-relative and stage coordinates.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{PlateGeometry, WellIndex};
use crate::transform::PlaneTransform;


/// Nearest-well answer for a stage position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WellLocation {
    /// Nearest well, clamped into the plate grid.
    pub well: WellIndex,
    /// Plate-frame offset from the center of `well`.
    pub offset: DVec2,
    /// False when the nearest grid cell lies outside the plate and `well` was clamped.
    pub in_plate: bool,
    /// Whether the position lies inside the footprint of `well`.
    pub in_well: bool,
}

/// A fitted transform bound to its plate, for callers that map repeatedly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    transform: PlaneTransform,
    geometry: PlateGeometry,
}

impl CoordinateMapper {
    pub fn new(transform: PlaneTransform, geometry: PlateGeometry) -> Result<Self> {
        transform.ensure_valid()?;
        geometry.validate()?;
        Ok(Self {
            transform,
            geometry,
        })
    }

    pub fn transform(&self) -> &PlaneTransform {
        &self.transform
    }

    pub fn geometry(&self) -> &PlateGeometry {
        &self.geometry
    }

    pub fn to_stage(&self, well: WellIndex, offset: DVec2) -> Result<DVec2> {
        to_stage(&self.transform, &self.geometry, well, offset)
    }

    pub fn to_well(&self, stage: DVec2) -> Result<WellLocation> {
        to_well(&self.transform, &self.geometry, stage)
    }

    pub fn well_centers(&self) -> Result<Vec<DVec2>> {
        well_centers(&self.transform, &self.geometry)
    }
}

/// Stage position of `offset` inside `well`.
pub fn to_stage(
    transform: &PlaneTransform,
    geometry: &PlateGeometry,
    well: WellIndex,
    offset: DVec2,
) -> Result<DVec2> {
    transform.ensure_valid()?;
    geometry.validate()?;
    geometry.check_well(well)?;
    transform.apply(geometry.nominal_position(well, offset))
}

/// Nearest well and well-relative offset for a stage position.
///
/// Positions off the plate are clamped to the closest edge well rather than
/// rejected; `in_plate` reports the clamp. Fails only for an unfit transform
/// or a malformed geometry.
pub fn to_well(
    transform: &PlaneTransform,
    geometry: &PlateGeometry,
    stage: DVec2,
) -> Result<WellLocation> {
    geometry.validate()?;
    let plate = transform.apply_inverse(stage)?;
    let cell = (plate / geometry.well_spacing).round();

    let max_row = geometry.rows.saturating_sub(1) as f64;
    let max_col = geometry.columns.saturating_sub(1) as f64;
    let in_plate = (0.0..=max_col).contains(&cell.x) && (0.0..=max_row).contains(&cell.y);

    let well = WellIndex::new(
        cell.y.clamp(0.0, max_row) as usize,
        cell.x.clamp(0.0, max_col) as usize,
    );
    let offset = plate - geometry.nominal_position(well, DVec2::ZERO);

    Ok(WellLocation {
        well,
        offset,
        in_plate,
        in_well: geometry.offset_in_well(offset),
    })
}

/// Stage positions of every well center, row-major.
pub fn well_centers(transform: &PlaneTransform, geometry: &PlateGeometry) -> Result<Vec<DVec2>> {
    transform.ensure_valid()?;
    geometry.validate()?;
    geometry
        .wells()
        .map(|well| transform.apply(geometry.nominal_position(well, DVec2::ZERO)))
        .collect()
}
