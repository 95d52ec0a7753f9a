// fusion_core/src/utils/angles.rs

use nalgebra::{DMatrix, DVector};
use std::f64::consts::{PI, TAU};

/// Wraps an angle into the half-open interval (-pi, pi].
///
/// Values already in range are returned bit-for-bit unchanged, so wrapping a
/// small difference never introduces round-off. Everything else goes through
/// a closed-form `rem_euclid`, which is exact for multiples of pi
/// (`-pi` maps to `pi`). Non-finite input is passed through untouched.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() || (angle > -PI && angle <= PI) {
        return angle;
    }
    let wrapped = angle.rem_euclid(TAU); // [0, 2pi)
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Normalizes the given components of a difference vector in place.
pub fn normalize_components(diff: &mut DVector<f64>, indices: &[usize]) {
    for &i in indices {
        diff[i] = normalize_angle(diff[i]);
    }
}

/// Weighted mean of the columns of `points`.
///
/// Rows listed in `angular` are averaged on the unit circle, as the `atan2`
/// of the weighted sines and cosines, so samples on both sides of +-pi do
/// not average out to a heading on the far side of the circle.
pub fn weighted_mean(
    points: &DMatrix<f64>,
    weights: &DVector<f64>,
    angular: &[usize],
) -> DVector<f64> {
    let mut mean = points * weights;
    for &row in angular {
        let (mut sin_sum, mut cos_sum) = (0.0, 0.0);
        for (angle, w) in points.row(row).iter().zip(weights.iter()) {
            sin_sum += w * angle.sin();
            cos_sum += w * angle.cos();
        }
        mean[row] = normalize_angle(sin_sum.atan2(cos_sum));
    }
    mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_in_range_values_are_unchanged() {
        for angle in [0.0, 0.1, -0.1, 3.0, -3.0, PI] {
            assert_eq!(normalize_angle(angle), angle);
        }
    }

    #[test]
    fn test_minus_pi_maps_to_pi() {
        assert_eq!(normalize_angle(-PI), PI);
        // Odd multiples of pi land on the boundary up to the rounding of `3.0 * PI`.
        for angle in [3.0 * PI, -3.0 * PI, 5.0 * PI] {
            assert_abs_diff_eq!(normalize_angle(angle).abs(), PI, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_result_always_in_half_open_interval() {
        let mut angle = -50.0;
        while angle < 50.0 {
            let n = normalize_angle(angle);
            assert!(n > -PI && n <= PI, "normalize_angle({angle}) = {n}");
            angle += 0.0371;
        }
    }

    #[test]
    fn test_periodic_in_two_pi() {
        for base in [0.3, -1.2, 2.9, -2.9, 1.0e-3] {
            for k in -5..=5 {
                let shifted = base + TAU * k as f64;
                assert_abs_diff_eq!(normalize_angle(shifted), normalize_angle(base), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_difference_of_two_in_range_angles() {
        // 179 deg - (-179 deg) is really -2 deg.
        let a = 179.0_f64.to_radians();
        let b = -179.0_f64.to_radians();
        assert_abs_diff_eq!(normalize_angle(a - b), -2.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_nan_passes_through() {
        assert!(normalize_angle(f64::NAN).is_nan());
    }

    #[test]
    fn test_normalize_components_only_touches_listed_indices() {
        let mut diff = DVector::from_vec(vec![7.0, 7.0, -7.0]);
        normalize_components(&mut diff, &[1]);
        assert_eq!(diff[0], 7.0);
        assert_abs_diff_eq!(diff[1], 7.0 - TAU, epsilon = 1e-12);
        assert_eq!(diff[2], -7.0);
    }

    #[test]
    fn test_weighted_mean_across_the_branch_cut() {
        // Columns at pi - 0.1 and -pi + 0.1: the linear mean is 0, the heading is pi.
        let points = DMatrix::from_row_slice(2, 2, &[1.0, 3.0, PI - 0.1, -PI + 0.1]);
        let weights = DVector::from_vec(vec![0.5, 0.5]);

        let mean = weighted_mean(&points, &weights, &[1]);
        assert_abs_diff_eq!(mean[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mean[1], PI, epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_mean_with_negative_centre_weight() {
        // Sigma-point style weights: symmetric pairs keep the centre exactly.
        let centre = 0.4;
        let points = DMatrix::from_row_slice(
            1,
            5,
            &[centre, centre + 1.2, centre - 1.2, centre + 0.3, centre - 0.3],
        );
        let third = 1.0 / 3.0;
        let weights = DVector::from_vec(vec![-third, third, third, third, third]);

        let mean = weighted_mean(&points, &weights, &[0]);
        assert_abs_diff_eq!(mean[0], centre, epsilon = 1e-12);
        assert_abs_diff_eq!(weighted_mean(&points, &weights, &[])[0], centre, epsilon = 1e-12);
    }
}
