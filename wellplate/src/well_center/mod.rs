//! Well center estimation from operator-recorded stage positions.
//!
//! The averaging modes (`ThreePoint`, `FivePoint`) take the arithmetic mean
//! of points placed symmetrically on the well edge. For the center plus four
//! cardinal edges this equals averaging opposite-edge pairs, which cancels
//! first-order symmetric offset error without a full circle fit.
//! `Circumcircle` is the exact three-point circle fit, offered separately.

use glam::DVec2;
use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::error::{CalibrationError, Result};

#[cfg(test)]
mod tests;

/// How the points recorded for one well are turned into its center.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, Serialize, Deserialize,
)]
pub enum CenterMode {
    /// The stage was centered on the well by eye; the point is the center.
    #[default]
    #[serde(rename = "center")]
    #[strum(serialize = "center")]
    OnePoint,
    /// Three points around a circular well, averaged.
    #[serde(rename = "three-point")]
    #[strum(serialize = "three-point")]
    ThreePoint,
    /// Center plus the four cardinal edges of a circular well, averaged.
    #[serde(rename = "five-point")]
    #[strum(serialize = "five-point")]
    FivePoint,
    /// Two opposite corners of a rectangular well.
    #[serde(rename = "two-corners")]
    #[strum(serialize = "two-corners")]
    TwoCorners,
    /// One point on each edge of a rectangular well.
    #[serde(rename = "four-edges")]
    #[strum(serialize = "four-edges")]
    FourEdges,
    /// Three points on the circumference, exact circumcenter.
    #[serde(rename = "circumcircle")]
    #[strum(serialize = "circumcircle")]
    Circumcircle,
}

impl CenterMode {
    pub fn required_points(&self) -> usize {
        match self {
            CenterMode::OnePoint => 1,
            CenterMode::TwoCorners => 2,
            CenterMode::ThreePoint | CenterMode::Circumcircle => 3,
            CenterMode::FourEdges => 4,
            CenterMode::FivePoint => 5,
        }
    }

    /// Modes that make sense for a well shape, most common first.
    pub fn for_well_shape(circular: bool) -> &'static [CenterMode] {
        if circular {
            &[
                CenterMode::OnePoint,
                CenterMode::ThreePoint,
                CenterMode::FivePoint,
                CenterMode::Circumcircle,
            ]
        } else {
            &[
                CenterMode::OnePoint,
                CenterMode::TwoCorners,
                CenterMode::FourEdges,
            ]
        }
    }
}

/// Relative tolerance below which three circumference points count as collinear.
const CIRCUMCIRCLE_TOLERANCE: f64 = 1e-9;

/// Estimates a well center from exactly `mode.required_points()` stage positions.
pub fn fit_well_center(mode: CenterMode, points: &[DVec2]) -> Result<DVec2> {
    let expected = mode.required_points();
    if points.len() != expected {
        return Err(CalibrationError::InvalidPointCount {
            mode,
            expected,
            found: points.len(),
        });
    }

    let center = match mode {
        CenterMode::OnePoint => points[0],
        CenterMode::ThreePoint | CenterMode::FivePoint | CenterMode::TwoCorners => mean(points),
        CenterMode::FourEdges => bounding_box_center(points),
        CenterMode::Circumcircle => circumcenter(points[0], points[1], points[2])?,
    };

    debug!(
        "well center ({}, {} points): ({:.3}, {:.3})",
        mode,
        points.len(),
        center.x,
        center.y
    );
    Ok(center)
}

fn mean(points: &[DVec2]) -> DVec2 {
    let sum: DVec2 = points.iter().copied().sum();
    sum / points.len() as f64
}

fn bounding_box_center(points: &[DVec2]) -> DVec2 {
    let min = points.iter().copied().fold(DVec2::INFINITY, DVec2::min);
    let max = points.iter().copied().fold(DVec2::NEG_INFINITY, DVec2::max);
    (min + max) * 0.5
}

fn circumcenter(p0: DVec2, p1: DVec2, p2: DVec2) -> Result<DVec2> {
    // Work relative to p0 to keep stage-sized coordinates from swamping the determinant.
    let a = p1 - p0;
    let b = p2 - p0;
    let d = 2.0 * a.perp_dot(b);
    if d.abs() <= 2.0 * CIRCUMCIRCLE_TOLERANCE * a.length() * b.length() || d == 0.0 {
        return Err(CalibrationError::CollinearPoints);
    }

    let aa = a.length_squared();
    let bb = b.length_squared();
    let local = DVec2::new(b.y * aa - a.y * bb, a.x * bb - b.x * aa) / d;
    Ok(p0 + local)
}

/// Points recorded so far for one well and the center they determine.
///
/// `center` is `None` until the mode's point count is reached, and whenever
/// the recorded points fail to determine a center.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WellCalibrationResult {
    mode: CenterMode,
    source_points: Vec<DVec2>,
    center: Option<DVec2>,
}

impl WellCalibrationResult {
    pub fn new(mode: CenterMode) -> Self {
        Self {
            mode,
            source_points: Vec::with_capacity(mode.required_points()),
            center: None,
        }
    }

    pub fn from_points(mode: CenterMode, points: &[DVec2]) -> Result<Self> {
        let center = fit_well_center(mode, points)?;
        Ok(Self {
            mode,
            source_points: points.to_vec(),
            center: Some(center),
        })
    }

    pub fn mode(&self) -> CenterMode {
        self.mode
    }

    pub fn source_points(&self) -> &[DVec2] {
        &self.source_points
    }

    pub fn center(&self) -> Option<DVec2> {
        self.center
    }

    pub fn is_calibrated(&self) -> bool {
        self.center.is_some()
    }

    pub fn missing_points(&self) -> usize {
        self.mode
            .required_points()
            .saturating_sub(self.source_points.len())
    }

    /// Switches mode. Recorded points belong to the old mode and are dropped.
    pub fn set_mode(&mut self, mode: CenterMode) {
        if mode != self.mode {
            self.mode = mode;
            self.clear();
        }
    }

    /// Records the next point; returns the center once the mode is satisfied.
    pub fn push(&mut self, point: DVec2) -> Result<Option<DVec2>> {
        let expected = self.mode.required_points();
        if self.source_points.len() >= expected {
            return Err(CalibrationError::InvalidPointCount {
                mode: self.mode,
                expected,
                found: self.source_points.len() + 1,
            });
        }
        self.source_points.push(point);
        self.refit()
    }

    /// Replaces a recorded point.
    ///
    /// # Panics
    /// Panics if `index` is not a recorded point.
    pub fn replace(&mut self, index: usize, point: DVec2) -> Result<Option<DVec2>> {
        assert!(
            index < self.source_points.len(),
            "Point index {} out of range for {} recorded points",
            index,
            self.source_points.len()
        );
        self.source_points[index] = point;
        self.refit()
    }

    pub fn clear(&mut self) {
        self.source_points.clear();
        self.center = None;
    }

    fn refit(&mut self) -> Result<Option<DVec2>> {
        self.center = None;
        if self.source_points.len() < self.mode.required_points() {
            return Ok(None);
        }
        let center = fit_well_center(self.mode, &self.source_points)?;
        self.center = Some(center);
        Ok(self.center)
    }
}
