//! Tests for well center estimation.

use super::*;
use strum::IntoEnumIterator;

const EPSILON: f64 = 1e-9;

fn approx_vec(a: DVec2, b: DVec2) -> bool {
    (a - b).length() < EPSILON * b.length().max(1.0)
}

#[test]
fn test_required_points() {
    assert_eq!(CenterMode::OnePoint.required_points(), 1);
    assert_eq!(CenterMode::TwoCorners.required_points(), 2);
    assert_eq!(CenterMode::ThreePoint.required_points(), 3);
    assert_eq!(CenterMode::Circumcircle.required_points(), 3);
    assert_eq!(CenterMode::FourEdges.required_points(), 4);
    assert_eq!(CenterMode::FivePoint.required_points(), 5);
}

#[test]
fn test_mode_names() {
    assert_eq!(CenterMode::OnePoint.to_string(), "center");
    assert_eq!(CenterMode::ThreePoint.to_string(), "three-point");
    assert_eq!(CenterMode::FivePoint.to_string(), "five-point");
    assert_eq!(
        serde_json::to_string(&CenterMode::FivePoint).unwrap(),
        "\"five-point\""
    );
    assert_eq!(
        serde_json::from_str::<CenterMode>("\"center\"").unwrap(),
        CenterMode::OnePoint
    );
}

#[test]
fn test_modes_per_shape_cover_all_modes() {
    for mode in CenterMode::iter() {
        let offered = CenterMode::for_well_shape(true).contains(&mode)
            || CenterMode::for_well_shape(false).contains(&mode);
        assert!(offered, "{mode} is not offered for any well shape");
    }
    assert_eq!(CenterMode::for_well_shape(true)[0], CenterMode::OnePoint);
    assert_eq!(CenterMode::for_well_shape(false)[0], CenterMode::OnePoint);
}

#[test]
fn test_one_point_is_center() {
    let p = DVec2::new(12345.6, -789.0);
    assert_eq!(fit_well_center(CenterMode::OnePoint, &[p]).unwrap(), p);
}

#[test]
fn test_wrong_point_count() {
    let points = [DVec2::ZERO, DVec2::ONE];
    for mode in CenterMode::iter().filter(|m| m.required_points() != 2) {
        assert_eq!(
            fit_well_center(mode, &points),
            Err(CalibrationError::InvalidPointCount {
                mode,
                expected: mode.required_points(),
                found: 2,
            })
        );
    }
    assert!(matches!(
        fit_well_center(CenterMode::OnePoint, &[]),
        Err(CalibrationError::InvalidPointCount { found: 0, .. })
    ));
}

#[test]
fn test_five_point_cardinal_layout_is_exact() {
    let d = 3200.0;
    let points = [
        DVec2::new(0.0, 0.0),
        DVec2::new(-d, 0.0),
        DVec2::new(d, 0.0),
        DVec2::new(0.0, -d),
        DVec2::new(0.0, d),
    ];
    assert_eq!(
        fit_well_center(CenterMode::FivePoint, &points).unwrap(),
        DVec2::ZERO
    );
}

#[test]
fn test_five_point_cancels_symmetric_offset() {
    // Edge points all pushed outward by the same amount still average to the center.
    let center = DVec2::new(50_000.0, 20_000.0);
    let r = 3200.0 + 40.0;
    let points = [
        center,
        center + DVec2::new(-r, 0.0),
        center + DVec2::new(r, 0.0),
        center + DVec2::new(0.0, -r),
        center + DVec2::new(0.0, r),
    ];
    let fitted = fit_well_center(CenterMode::FivePoint, &points).unwrap();
    assert!(approx_vec(fitted, center));
}

#[test]
fn test_three_point_is_mean() {
    let points = [
        DVec2::new(0.0, 0.0),
        DVec2::new(-100.0, 0.0),
        DVec2::new(100.0, 30.0),
    ];
    let fitted = fit_well_center(CenterMode::ThreePoint, &points).unwrap();
    assert!(approx_vec(fitted, DVec2::new(0.0, 10.0)));
}

#[test]
fn test_two_corners_midpoint() {
    let points = [DVec2::new(-3200.0, 2400.0), DVec2::new(3200.0, -2400.0)];
    let fitted = fit_well_center(CenterMode::TwoCorners, &points).unwrap();
    assert!(approx_vec(fitted, DVec2::ZERO));
}

#[test]
fn test_four_edges_bounding_box() {
    // Left, top, right, bottom edge points at arbitrary positions along each edge.
    let points = [
        DVec2::new(1000.0 - 3200.0, 1500.0 + 700.0),
        DVec2::new(1000.0 - 1000.0, 1500.0 + 2400.0),
        DVec2::new(1000.0 + 3200.0, 1500.0 - 2000.0),
        DVec2::new(1000.0 + 2500.0, 1500.0 - 2400.0),
    ];
    let fitted = fit_well_center(CenterMode::FourEdges, &points).unwrap();
    assert!(approx_vec(fitted, DVec2::new(1000.0, 1500.0)));
}

#[test]
fn test_circumcircle_exact() {
    let center = DVec2::new(99_000.0, 64_500.0);
    let r = 3200.0;
    let points = [0.3_f64, 2.0, 4.1].map(|a| center + DVec2::from_angle(a) * r);
    let fitted = fit_well_center(CenterMode::Circumcircle, &points).unwrap();
    assert!((fitted - center).length() < 1e-6, "{fitted}");
}

#[test]
fn test_circumcircle_collinear() {
    let points = [
        DVec2::new(0.0, 0.0),
        DVec2::new(10.0, 10.0),
        DVec2::new(20.0, 20.0),
    ];
    assert_eq!(
        fit_well_center(CenterMode::Circumcircle, &points),
        Err(CalibrationError::CollinearPoints)
    );

    let coincident = [DVec2::ONE; 3];
    assert_eq!(
        fit_well_center(CenterMode::Circumcircle, &coincident),
        Err(CalibrationError::CollinearPoints)
    );
}

#[test]
fn test_result_incremental() {
    let mut result = WellCalibrationResult::new(CenterMode::ThreePoint);
    assert!(!result.is_calibrated());
    assert_eq!(result.missing_points(), 3);

    assert_eq!(result.push(DVec2::new(-10.0, 0.0)).unwrap(), None);
    assert_eq!(result.push(DVec2::new(10.0, 0.0)).unwrap(), None);
    assert_eq!(result.center(), None);
    let center = result.push(DVec2::new(0.0, 30.0)).unwrap();
    assert_eq!(center, Some(DVec2::new(0.0, 10.0)));
    assert!(result.is_calibrated());
    assert_eq!(result.missing_points(), 0);
    assert_eq!(result.source_points().len(), 3);
}

#[test]
fn test_result_rejects_extra_point() {
    let mut result = WellCalibrationResult::new(CenterMode::OnePoint);
    result.push(DVec2::ONE).unwrap();
    assert_eq!(
        result.push(DVec2::ZERO),
        Err(CalibrationError::InvalidPointCount {
            mode: CenterMode::OnePoint,
            expected: 1,
            found: 2,
        })
    );
    assert_eq!(result.center(), Some(DVec2::ONE));
}

#[test]
fn test_result_replace_refits() {
    let mut result =
        WellCalibrationResult::from_points(CenterMode::TwoCorners, &[DVec2::ZERO, DVec2::ONE])
            .unwrap();
    assert_eq!(result.center(), Some(DVec2::splat(0.5)));

    result.replace(1, DVec2::splat(3.0)).unwrap();
    assert_eq!(result.center(), Some(DVec2::splat(1.5)));
}

#[test]
fn test_result_failed_refit_clears_center() {
    let mut result = WellCalibrationResult::new(CenterMode::Circumcircle);
    result.push(DVec2::new(1.0, 0.0)).unwrap();
    result.push(DVec2::new(0.0, 1.0)).unwrap();
    assert!(result.push(DVec2::new(-1.0, 0.0)).unwrap().is_some());

    // Moving the third point onto the line through the first two.
    assert_eq!(
        result.replace(2, DVec2::new(2.0, -1.0)),
        Err(CalibrationError::CollinearPoints)
    );
    assert!(!result.is_calibrated());
    assert_eq!(result.source_points().len(), 3);
}

#[test]
#[should_panic(expected = "Point index 4 out of range")]
fn test_result_replace_out_of_range() {
    let mut result = WellCalibrationResult::new(CenterMode::FivePoint);
    result.push(DVec2::ZERO).unwrap();
    let _ = result.replace(4, DVec2::ONE);
}

#[test]
fn test_result_set_mode_clears_points() {
    let mut result = WellCalibrationResult::from_points(CenterMode::OnePoint, &[DVec2::ONE])
        .unwrap();

    result.set_mode(CenterMode::OnePoint);
    assert!(result.is_calibrated());

    result.set_mode(CenterMode::FivePoint);
    assert_eq!(result.mode(), CenterMode::FivePoint);
    assert!(result.source_points().is_empty());
    assert!(!result.is_calibrated());
}
