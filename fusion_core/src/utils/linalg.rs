// fusion_core/src/utils/linalg.rs

use nalgebra::DMatrix;

/// Forces exact symmetry. Tiny numerical errors make `P - K S K^T`
/// slightly non-symmetric, which Cholesky does not forgive.
pub fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}

/// Ratio of the largest to the smallest singular value. Returns infinity for
/// a singular (or empty-spectrum) matrix.
pub fn condition_number(m: &DMatrix<f64>) -> f64 {
    let singular_values = m.clone().svd(false, false).singular_values;
    let max = singular_values.max();
    let min = singular_values.min();
    if min <= 0.0 || !min.is_finite() {
        f64::INFINITY
    } else {
        max / min
    }
}

pub fn is_finite(m: &DMatrix<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
}

/// Smallest eigenvalue of a symmetric matrix.
pub fn min_eigenvalue(m: &DMatrix<f64>) -> f64 {
    m.clone().symmetric_eigen().eigenvalues.min()
}

/// Largest absolute entry of `m - m^T`.
pub fn asymmetry(m: &DMatrix<f64>) -> f64 {
    (m - m.transpose()).amax()
}
