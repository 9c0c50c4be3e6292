//! Static plate layout: grid dimensions, pitch and well footprint.

use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};

/// Position of a well on the plate grid. `(0, 0)` is the reference well A1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WellIndex {
    pub row: usize,
    pub col: usize,
}

impl WellIndex {
    pub const A1: WellIndex = WellIndex { row: 0, col: 0 };

    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for WellIndex {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// Row labels run A..Z, AA..AZ, BA.. like spreadsheet columns.
fn row_label(mut row: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (row % 26) as u8);
        if row < 26 {
            break;
        }
        row = row / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

impl fmt::Display for WellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", row_label(self.row), self.col + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WellNameError {
    #[error("Well name is empty")]
    Empty,
    #[error("Well name {0:?} must be row letters followed by a 1-based column number")]
    Malformed(String),
}

impl FromStr for WellIndex {
    type Err = WellNameError;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WellNameError::Empty);
        }
        let malformed = || WellNameError::Malformed(name.to_string());

        let split = name
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(malformed)?;
        let (letters, digits) = name.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }

        let mut row = 0usize;
        for b in letters.bytes() {
            let v = (b.to_ascii_uppercase() - b'A') as usize + 1;
            row = row
                .checked_mul(26)
                .and_then(|r| r.checked_add(v))
                .ok_or_else(malformed)?;
        }
        let col: usize = digits.parse().map_err(|_| malformed())?;
        if col == 0 {
            return Err(malformed());
        }

        Ok(WellIndex::new(row - 1, col - 1))
    }
}

/// Layout of a multi-well plate, in stage units (µm).
///
/// Read-only for the lifetime of a calibration session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateGeometry {
    pub rows: usize,
    pub columns: usize,
    /// Center-to-center distance between neighbouring wells (dx, dy).
    pub well_spacing: DVec2,
    /// Well footprint (width, height). For circular wells the width is the diameter.
    pub well_size: DVec2,
    pub circular: bool,
}

impl PlateGeometry {
    pub fn new(
        rows: usize,
        columns: usize,
        well_spacing: DVec2,
        well_size: DVec2,
        circular: bool,
    ) -> Result<Self> {
        let geometry = Self {
            rows,
            columns,
            well_spacing,
            well_size,
            circular,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(CalibrationError::InvalidGeometry(format!(
                "plate must have at least one row and column, got {}x{}",
                self.rows, self.columns
            )));
        }
        let positive = |v: DVec2| v.is_finite() && v.x > 0.0 && v.y > 0.0;
        if !positive(self.well_spacing) {
            return Err(CalibrationError::InvalidGeometry(format!(
                "well spacing must be positive, got ({}, {})",
                self.well_spacing.x, self.well_spacing.y
            )));
        }
        if !positive(self.well_size) {
            return Err(CalibrationError::InvalidGeometry(format!(
                "well size must be positive, got ({}, {})",
                self.well_size.x, self.well_size.y
            )));
        }
        if self.well_size.x > self.well_spacing.x || self.well_size.y > self.well_spacing.y {
            return Err(CalibrationError::InvalidGeometry(format!(
                "wells of size ({}, {}) overlap at spacing ({}, {})",
                self.well_size.x, self.well_size.y, self.well_spacing.x, self.well_spacing.y
            )));
        }
        Ok(())
    }

    pub fn well_count(&self) -> usize {
        self.rows * self.columns
    }

    pub fn contains(&self, well: WellIndex) -> bool {
        well.row < self.rows && well.col < self.columns
    }

    pub fn check_well(&self, well: WellIndex) -> Result<()> {
        if self.contains(well) {
            Ok(())
        } else {
            Err(CalibrationError::WellOutOfRange {
                well,
                rows: self.rows,
                columns: self.columns,
            })
        }
    }

    /// Row-major flat index, `row * columns + col`.
    pub fn flat_index(&self, well: WellIndex) -> Option<usize> {
        self.contains(well).then(|| well.row * self.columns + well.col)
    }

    pub fn well_at(&self, flat_index: usize) -> Option<WellIndex> {
        (flat_index < self.well_count())
            .then(|| WellIndex::new(flat_index / self.columns, flat_index % self.columns))
    }

    /// All wells in row-major order.
    pub fn wells(&self) -> impl Iterator<Item = WellIndex> + '_ {
        (0..self.well_count()).map(move |i| WellIndex::new(i / self.columns, i % self.columns))
    }

    /// Nominal plate-frame position of `offset` inside `well`, relative to the A1 center.
    pub fn nominal_position(&self, well: WellIndex, offset: DVec2) -> DVec2 {
        DVec2::new(
            well.col as f64 * self.well_spacing.x,
            well.row as f64 * self.well_spacing.y,
        ) + offset
    }

    /// Whether a well-relative offset lies inside the well footprint.
    pub fn offset_in_well(&self, offset: DVec2) -> bool {
        let half = self.well_size * 0.5;
        if self.circular {
            offset.length() <= half.x
        } else {
            offset.x.abs() <= half.x && offset.y.abs() <= half.y
        }
    }
}
