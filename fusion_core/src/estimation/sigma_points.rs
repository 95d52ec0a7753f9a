// fusion_core/src/estimation/sigma_points.rs

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::FilterError;
use crate::utils::linalg;

/// A deterministic set of `2n + 1` points (one per column) that captures the
/// mean and covariance of an `n`-dimensional Gaussian, plus the weights that
/// reconstruct them.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaPoints {
    /// `n x (2n + 1)` matrix, column 0 is the mean.
    pub points: DMatrix<f64>,
    /// One weight per column. They sum to one.
    pub weights: DVector<f64>,
    /// The spread parameter the points were generated with.
    pub lambda: f64,
}

impl SigmaPoints {
    pub fn dim(&self) -> usize {
        self.points.nrows()
    }

    pub fn count(&self) -> usize {
        self.points.ncols()
    }
}

/// The classic spread parameter `lambda = 3 - n`.
pub fn spread_parameter(n: usize) -> f64 {
    3.0 - n as f64
}

/// Mean/covariance weights for `2n + 1` points: `w0 = lambda / (lambda + n)`,
/// `wi = 1 / (2 (lambda + n))`.
pub fn sigma_weights(n: usize, lambda: f64) -> DVector<f64> {
    let denom = lambda + n as f64;
    let mut weights = DVector::from_element(2 * n + 1, 0.5 / denom);
    weights[0] = lambda / denom;
    weights
}

/// Generates the `2n + 1` sigma points of `N(mean, covariance)`.
///
/// The matrix square root is the lower Cholesky factor `L` of `covariance`;
/// column `i + 1` is `mean + sqrt(lambda + n) * L_i` and column `i + n + 1`
/// is `mean - sqrt(lambda + n) * L_i`.
pub fn generate_sigma_points(
    mean: &DVector<f64>,
    covariance: &DMatrix<f64>,
    lambda: f64,
) -> Result<SigmaPoints, FilterError> {
    let n = mean.nrows();
    debug_assert_eq!(covariance.shape(), (n, n));

    let scale_sq = lambda + n as f64;
    if !(scale_sq > 0.0) {
        return Err(FilterError::InvalidConfig(format!(
            "sigma spread lambda + n must be positive, got {scale_sq}"
        )));
    }
    if !linalg::is_finite(covariance) || mean.iter().any(|v| !v.is_finite()) {
        return Err(FilterError::NonFinite {
            stage: "sigma point generation",
        });
    }

    // Cholesky decomposition: P = L * L^T
    let l_matrix = Cholesky::new(covariance.clone())
        .ok_or(FilterError::NotPositiveDefinite {
            stage: "sigma point generation",
        })?
        .l();
    let scaled_l = l_matrix * scale_sq.sqrt();

    let mut points = DMatrix::zeros(n, 2 * n + 1);
    points.column_mut(0).copy_from(mean);
    for i in 0..n {
        points
            .column_mut(i + 1)
            .copy_from(&(mean + scaled_l.column(i)));
        points
            .column_mut(i + n + 1)
            .copy_from(&(mean - scaled_l.column(i)));
    }

    Ok(SigmaPoints {
        points,
        weights: sigma_weights(n, lambda),
        lambda,
    })
}

/// State and covariance extended with the process-noise inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedState {
    pub mean: DVector<f64>,
    pub covariance: DMatrix<f64>,
}

/// Appends zero-mean noise dimensions to `x` and places `q` in the
/// bottom-right block of the covariance. Cross terms stay zero.
pub fn augment(x: &DVector<f64>, p: &DMatrix<f64>, q: &DMatrix<f64>) -> AugmentedState {
    let n_x = x.nrows();
    let n_aug = n_x + q.nrows();

    let mut mean = DVector::zeros(n_aug);
    mean.rows_mut(0, n_x).copy_from(x);

    let mut covariance = DMatrix::zeros(n_aug, n_aug);
    covariance.view_mut((0, 0), (n_x, n_x)).copy_from(p);
    covariance
        .view_mut((n_x, n_x), (q.nrows(), q.ncols()))
        .copy_from(q);

    AugmentedState { mean, covariance }
}

/// Augments the state and draws sigma points from the augmented Gaussian
/// with `lambda = 3 - n_aug`.
pub fn augmented_sigma_points(
    x: &DVector<f64>,
    p: &DMatrix<f64>,
    q: &DMatrix<f64>,
) -> Result<SigmaPoints, FilterError> {
    let augmented = augment(x, p, q);
    let lambda = spread_parameter(augmented.mean.nrows());
    generate_sigma_points(&augmented.mean, &augmented.covariance, lambda)
}
