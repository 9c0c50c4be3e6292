pub trait FloatExt {
    /// Compares with a tolerance relative to the larger magnitude, never
    /// tighter than `rel_tol` in absolute terms (so values near zero compare
    /// sanely).
    fn approximately_eq_rel(self, other: Self, rel_tol: Self) -> bool;
}

impl FloatExt for f64 {
    fn approximately_eq_rel(self, other: Self, rel_tol: Self) -> bool {
        let scale = self.abs().max(other.abs()).max(1.0);
        (self - other).abs() <= rel_tol * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_is_never_equal() {
        assert!(!f64::NAN.approximately_eq_rel(f64::NAN, 1e-6));
        assert!(!f64::NAN.approximately_eq_rel(0.0, 1e-6));
    }

    #[test]
    fn test_relative_tolerance_scales_with_magnitude() {
        // 50 µm off at 1e8 µm is within 1e-6 relative
        assert!(1.0e8_f64.approximately_eq_rel(1.0e8 + 50.0, 1e-6));
        assert!(!1.0e8_f64.approximately_eq_rel(1.0e8 + 500.0, 1e-6));
    }

    #[test]
    fn test_relative_tolerance_near_zero_is_absolute() {
        assert!(0.0_f64.approximately_eq_rel(5e-7, 1e-6));
        assert!(!0.0_f64.approximately_eq_rel(5e-6, 1e-6));
    }

    #[test]
    fn test_relative_symmetry() {
        let a = 12345.678_f64;
        let b = 12345.679_f64;
        assert_eq!(
            a.approximately_eq_rel(b, 1e-6),
            b.approximately_eq_rel(a, 1e-6),
            "approximately_eq_rel should be symmetric"
        );
    }
}
