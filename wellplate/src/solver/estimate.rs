//! Closed-form plane transform estimators.
//!
//! Pure geometry on nominal plate positions (`plate`) and measured stage
//! positions (`stage`), both already in canonical order. Degenerate inputs are
//! rejected by the caller before these run.

use glam::{DMat2, DVec2};

use crate::transform::PlaneTransform;

/// Centroid of a non-empty point set.
pub(crate) fn centroid(points: &[DVec2]) -> DVec2 {
    let sum: DVec2 = points.iter().copied().sum();
    sum / points.len() as f64
}

/// Whether every deviation vector from the first point is parallel to the
/// longest one, within `tolerance` of `|u × v| / (|u| |v|)`. Coincident sets
/// count as collinear.
pub(crate) fn is_collinear(points: &[DVec2], tolerance: f64) -> bool {
    let Some((&first, rest)) = points.split_first() else {
        return true;
    };
    if is_coincident(points, tolerance) {
        return true;
    }
    let deviations: Vec<DVec2> = rest.iter().map(|p| *p - first).collect();
    let longest = deviations
        .iter()
        .copied()
        .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .unwrap_or(DVec2::ZERO);
    let longest_len = longest.length();

    deviations
        .iter()
        .all(|v| longest.perp_dot(*v).abs() <= tolerance * longest_len * v.length())
}

/// Whether all points sit on top of each other, relative to their magnitude.
pub(crate) fn is_coincident(points: &[DVec2], tolerance: f64) -> bool {
    let Some(&first) = points.first() else {
        return true;
    };
    let magnitude = points.iter().map(|p| p.length()).fold(1.0_f64, f64::max);
    points
        .iter()
        .all(|p| (*p - first).length() <= tolerance * magnitude)
}

/// Exact two-point solution: rotation from the angle between the nominal and
/// measured connecting vectors, optional uniform scale from their length
/// ratio, translation anchoring the midpoints.
pub(crate) fn estimate_two_point(
    plate: [DVec2; 2],
    stage: [DVec2; 2],
    fit_scale: bool,
) -> PlaneTransform {
    let nominal = plate[1] - plate[0];
    let measured = stage[1] - stage[0];

    let angle = nominal.perp_dot(measured).atan2(nominal.dot(measured));
    let scale = if fit_scale {
        measured.length() / nominal.length()
    } else {
        1.0
    };

    let plate_mid = (plate[0] + plate[1]) * 0.5;
    let stage_mid = (stage[0] + stage[1]) * 0.5;
    let origin = stage_mid - DVec2::from_angle(angle).rotate(plate_mid * scale);

    PlaneTransform::new(origin, angle, DVec2::splat(scale))
}

/// Least-squares rotation + translation (+ optional uniform scale).
///
/// Procrustes analysis in 2D: the optimal rotation comes straight from the
/// summed dot and cross products of the centered point sets, no SVD needed.
/// Returns `None` when the fitted scale is not positive.
pub(crate) fn estimate_procrustes(
    plate: &[DVec2],
    stage: &[DVec2],
    fit_scale: bool,
) -> Option<PlaneTransform> {
    let plate_centroid = centroid(plate);
    let stage_centroid = centroid(stage);

    let mut dot = 0.0;
    let mut cross = 0.0;
    let mut plate_var = 0.0;
    for (p, s) in plate.iter().zip(stage.iter()) {
        let pc = *p - plate_centroid;
        let sc = *s - stage_centroid;
        dot += pc.dot(sc);
        cross += pc.perp_dot(sc);
        plate_var += pc.length_squared();
    }

    if plate_var <= 0.0 {
        return None;
    }

    let angle = cross.atan2(dot);
    let (sin_a, cos_a) = angle.sin_cos();
    let scale = if fit_scale {
        (dot * cos_a + cross * sin_a) / plate_var
    } else {
        1.0
    };
    if !(scale > 0.0 && scale.is_finite()) {
        return None;
    }

    let origin = stage_centroid - DVec2::from_angle(angle).rotate(plate_centroid * scale);
    Some(PlaneTransform::new(origin, angle, DVec2::splat(scale)))
}

/// Least-squares rotation + per-axis scale + translation.
///
/// Solves the general linear part `M` on centered points, then splits it into
/// the closest rotation and the scales along the rotated axes. Shear is
/// discarded. Returns `None` if the nominal positions do not span the plane
/// or a fitted scale is not positive.
pub(crate) fn estimate_per_axis(plate: &[DVec2], stage: &[DVec2]) -> Option<PlaneTransform> {
    let plate_centroid = centroid(plate);
    let stage_centroid = centroid(stage);

    // covariance = Σ pc pcᵀ, cross_cov = Σ sc pcᵀ (column-major)
    let mut covariance = DMat2::ZERO;
    let mut cross_cov = DMat2::ZERO;
    for (p, s) in plate.iter().zip(stage.iter()) {
        let pc = *p - plate_centroid;
        let sc = *s - stage_centroid;
        covariance += DMat2::from_cols(pc * pc.x, pc * pc.y);
        cross_cov += DMat2::from_cols(sc * pc.x, sc * pc.y);
    }

    let det = covariance.determinant();
    if !(det.abs() > 0.0 && det.is_finite()) {
        return None;
    }
    let linear = cross_cov * covariance.inverse();

    let (a, c) = (linear.x_axis.x, linear.x_axis.y);
    let (b, d) = (linear.y_axis.x, linear.y_axis.y);
    let angle = (c - b).atan2(a + d);
    let (sin_a, cos_a) = angle.sin_cos();
    let scale = DVec2::new(a * cos_a + c * sin_a, -b * sin_a + d * cos_a);
    if !(scale.x > 0.0 && scale.y > 0.0 && scale.is_finite()) {
        return None;
    }

    let origin = stage_centroid - DVec2::from_angle(angle).rotate(plate_centroid * scale);
    Some(PlaneTransform::new(origin, angle, scale))
}
