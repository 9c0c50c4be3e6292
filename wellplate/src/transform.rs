//! Plate-to-stage plane transform.

use common::float_ext::FloatExt;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};

/// Maps nominal plate-frame coordinates to stage coordinates:
///
/// ```text
/// stage = origin + R(rotation) * (scale ⊙ plate)
/// ```
///
/// `origin` is the stage position of the A1 center. A transform is only usable
/// once it has been fitted (or explicitly constructed from known parameters);
/// [`PlaneTransform::default`] is the unfit state and every mapping through it
/// fails with [`CalibrationError::UntransformedState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPlaneTransform")]
pub struct PlaneTransform {
    pub origin: DVec2,
    /// Counter-clockwise rotation in radians.
    pub rotation: f64,
    /// Per-axis pitch correction, (1, 1) when pitch matches the plate description.
    pub scale: DVec2,
    valid: bool,
}

/// Unchecked wire form; a transform marked valid must pass the same checks as
/// [`PlaneTransform::try_new`].
#[derive(Deserialize)]
struct RawPlaneTransform {
    origin: DVec2,
    rotation: f64,
    scale: DVec2,
    valid: bool,
}

impl TryFrom<RawPlaneTransform> for PlaneTransform {
    type Error = CalibrationError;

    fn try_from(raw: RawPlaneTransform) -> Result<Self> {
        if raw.valid {
            Self::try_new(raw.origin, raw.rotation, raw.scale)
        } else {
            Ok(Self::unfit())
        }
    }
}

impl Default for PlaneTransform {
    fn default() -> Self {
        Self::unfit()
    }
}

impl std::fmt::Display for PlaneTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.valid {
            return write!(f, "PlaneTransform(unfit)");
        }
        write!(
            f,
            "PlaneTransform(origin=({:.2}, {:.2}), rot={:.4}°, scale=({:.5}, {:.5}))",
            self.origin.x,
            self.origin.y,
            self.rotation.to_degrees(),
            self.scale.x,
            self.scale.y
        )
    }
}

impl PlaneTransform {
    /// A transform with known parameters.
    ///
    /// # Panics
    /// Panics if any parameter is non-finite or a scale component is not positive.
    pub fn new(origin: DVec2, rotation: f64, scale: DVec2) -> Self {
        Self::try_new(origin, rotation, scale).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Fallible [`PlaneTransform::new`] for parameters from outside the program,
    /// e.g. a saved calibration.
    pub fn try_new(origin: DVec2, rotation: f64, scale: DVec2) -> Result<Self> {
        if !origin.is_finite() || !rotation.is_finite() {
            return Err(CalibrationError::InvalidTransform(
                "PlaneTransform origin and rotation must be finite".to_string(),
            ));
        }
        if !(scale.is_finite() && scale.x > 0.0 && scale.y > 0.0) {
            return Err(CalibrationError::InvalidTransform(format!(
                "PlaneTransform scale must be positive, got ({}, {})",
                scale.x, scale.y
            )));
        }
        Ok(Self {
            origin,
            rotation: normalize_angle(rotation),
            scale,
            valid: true,
        })
    }

    /// Rotation and translation only, scale fixed at (1, 1).
    pub fn rigid(origin: DVec2, rotation: f64) -> Self {
        Self::new(origin, rotation, DVec2::ONE)
    }

    pub fn identity() -> Self {
        Self::new(DVec2::ZERO, 0.0, DVec2::ONE)
    }

    /// The not-yet-fitted state.
    pub fn unfit() -> Self {
        Self {
            origin: DVec2::ZERO,
            rotation: 0.0,
            scale: DVec2::ONE,
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn ensure_valid(&self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(CalibrationError::UntransformedState)
        }
    }

    /// Applies scale and rotation without translation.
    pub fn apply_linear(&self, v: DVec2) -> DVec2 {
        DVec2::from_angle(self.rotation).rotate(v * self.scale)
    }

    pub fn apply(&self, plate: DVec2) -> Result<DVec2> {
        self.ensure_valid()?;
        Ok(self.origin + self.apply_linear(plate))
    }

    pub fn apply_inverse(&self, stage: DVec2) -> Result<DVec2> {
        self.ensure_valid()?;
        let unrotated = DVec2::from_angle(-self.rotation).rotate(stage - self.origin);
        Ok(unrotated / self.scale)
    }

    /// Parameter-wise comparison with tolerance `rel_tol` relative to each
    /// parameter's magnitude. Unfit transforms only match each other.
    pub fn approx_eq(&self, other: &Self, rel_tol: f64) -> bool {
        if !self.valid || !other.valid {
            return self.valid == other.valid;
        }
        let vec_eq = |a: DVec2, b: DVec2| {
            a.x.approximately_eq_rel(b.x, rel_tol) && a.y.approximately_eq_rel(b.y, rel_tol)
        };
        vec_eq(self.origin, other.origin)
            && vec_eq(self.scale, other.scale)
            && normalize_angle(self.rotation - other.rotation).approximately_eq_rel(0.0, rel_tol)
    }
}

/// Wraps an angle into `(-π, π]`.
pub(crate) fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.sin().atan2(angle.cos());
    if wrapped <= -std::f64::consts::PI {
        wrapped + 2.0 * std::f64::consts::PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPSILON: f64 = 1e-9;

    fn approx_vec(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < EPSILON * b.length().max(1.0)
    }

    #[test]
    fn test_default_is_unfit() {
        let t = PlaneTransform::default();
        assert!(!t.is_valid());
        assert_eq!(
            t.apply(DVec2::ZERO),
            Err(CalibrationError::UntransformedState)
        );
        assert_eq!(
            t.apply_inverse(DVec2::ZERO),
            Err(CalibrationError::UntransformedState)
        );
        assert_eq!(t.to_string(), "PlaneTransform(unfit)");
    }

    #[test]
    fn test_identity_maps_to_itself() {
        let t = PlaneTransform::identity();
        let p = DVec2::new(5.0, 7.0);
        assert!(approx_vec(t.apply(p).unwrap(), p));
    }

    #[test]
    fn test_rotation_then_translation() {
        let t = PlaneTransform::rigid(DVec2::new(100.0, 200.0), FRAC_PI_2);
        // (1, 0) rotated 90° ccw is (0, 1)
        let p = t.apply(DVec2::new(1.0, 0.0)).unwrap();
        assert!(approx_vec(p, DVec2::new(100.0, 201.0)));
    }

    #[test]
    fn test_scale_applies_before_rotation() {
        let t = PlaneTransform::new(DVec2::ZERO, FRAC_PI_2, DVec2::new(2.0, 3.0));
        let p = t.apply(DVec2::new(1.0, 1.0)).unwrap();
        // (2, 3) rotated 90° ccw
        assert!(approx_vec(p, DVec2::new(-3.0, 2.0)));
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = PlaneTransform::new(DVec2::new(-1234.5, 987.0), 0.3, DVec2::new(1.01, 0.99));
        for p in [
            DVec2::ZERO,
            DVec2::new(9000.0, 0.0),
            DVec2::new(-50.0, 63000.0),
        ] {
            let back = t.apply_inverse(t.apply(p).unwrap()).unwrap();
            assert!(approx_vec(back, p), "{p} -> {back}");
        }
    }

    #[test]
    fn test_rotation_is_normalized() {
        let t = PlaneTransform::rigid(DVec2::ZERO, 1.0 + 4.0 * PI);
        assert!((t.rotation - 1.0).abs() < EPSILON);
        let t = PlaneTransform::rigid(DVec2::ZERO, 1.5 * PI);
        assert!((t.rotation + 0.5 * PI).abs() < EPSILON);
        let t = PlaneTransform::rigid(DVec2::ZERO, -0.25 - 2.0 * PI);
        assert!((t.rotation + 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_approx_eq_tolerates_noise() {
        let a = PlaneTransform::new(DVec2::new(1000.0, -500.0), PI - 1e-12, DVec2::ONE);
        let b = PlaneTransform::new(DVec2::new(1000.0 + 1e-7, -500.0), -PI + 1e-12, DVec2::ONE);
        assert!(a.approx_eq(&b, 1e-9));
        assert!(!a.approx_eq(&PlaneTransform::rigid(DVec2::new(1001.0, -500.0), PI), 1e-9));
        assert!(!a.approx_eq(&PlaneTransform::unfit(), 1e-9));
        assert!(PlaneTransform::unfit().approx_eq(&PlaneTransform::unfit(), 1e-9));
    }

    #[test]
    fn test_deserialize_rejects_bad_valid_transform() {
        let json = r#"{"origin":[0.0,0.0],"rotation":0.0,"scale":[0.0,-1.0],"valid":true}"#;
        let err = serde_json::from_str::<PlaneTransform>(json).unwrap_err();
        assert!(err.to_string().contains("scale must be positive"), "{err}");

        // Parameters of an unfit transform are not meaningful.
        let json = r#"{"origin":[5.0,5.0],"rotation":0.0,"scale":[0.0,-1.0],"valid":false}"#;
        let unfit: PlaneTransform = serde_json::from_str(json).unwrap();
        assert_eq!(unfit, PlaneTransform::unfit());
    }

    #[test]
    fn test_try_new_rejects_non_finite() {
        assert!(matches!(
            PlaneTransform::try_new(DVec2::new(f64::NAN, 0.0), 0.0, DVec2::ONE),
            Err(CalibrationError::InvalidTransform(_))
        ));
        assert!(matches!(
            PlaneTransform::try_new(DVec2::ZERO, 0.0, DVec2::new(1.0, f64::INFINITY)),
            Err(CalibrationError::InvalidTransform(_))
        ));
    }

    #[test]
    #[should_panic(expected = "PlaneTransform scale must be positive")]
    fn test_zero_scale_panics() {
        PlaneTransform::new(DVec2::ZERO, 0.0, DVec2::new(0.0, 1.0));
    }

    #[test]
    fn test_json_roundtrip_is_exact() {
        let t = PlaneTransform::new(
            DVec2::new(1000.123456789, -1500.987654321),
            0.012345678901234,
            DVec2::new(1.000123, 0.999877),
        );
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"origin\""));
        assert!(json.contains("\"valid\":true"));
        let back: PlaneTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);

        let unfit: PlaneTransform =
            serde_json::from_str(&serde_json::to_string(&PlaneTransform::unfit()).unwrap())
                .unwrap();
        assert!(!unfit.is_valid());
    }
}
