//! Matrix decompositions and linear solves.
//!
//! Every routine converts its [`Matrix`] operand to an `nalgebra::DMatrix`
//! and runs the corresponding `nalgebra` factorisation:
//!
//! - Cholesky factorisation, falling back to a spectral square root for
//!   singular covariance matrices
//! - Symmetric eigen-decomposition
//! - LU solves with a relative pivot check
//! - Eigenvalue clipping for the nearest positive semi-definite matrix in
//!   Frobenius norm

use super::matrix::Matrix;
use crate::types::LinalgError;
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Symmetry tolerance for decompositions, relative to entry magnitude.
pub const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Maximum QR sweeps of the symmetric eigen-solver.
const MAX_EIGEN_ITERATIONS: usize = 10_000;

/// LU pivots below this fraction of the largest row sum count as zero.
const SINGULAR_PIVOT: f64 = 1e-14;

/// Lower-triangular Cholesky factor `L` with `A = L·Lᵀ`.
///
/// # Errors
///
/// - `LinalgError::NotSquare` / `NotSymmetric` for malformed input
/// - `LinalgError::NotPositiveDefinite` if the matrix is not strictly
///   positive definite
///
/// # Examples
///
/// ```
/// use wealth_core::math::{cholesky, Matrix};
///
/// let a = Matrix::from_rows(vec![vec![4.0, 2.0], vec![2.0, 3.0]]).unwrap();
/// let l = cholesky(&a).unwrap();
/// assert!((l[(1, 1)] - 2.0_f64.sqrt()).abs() < 1e-12);
/// ```
pub fn cholesky(a: &Matrix) -> Result<Matrix, LinalgError> {
    a.check_symmetric(SYMMETRY_TOLERANCE)?;
    match lower_factor(a) {
        Some(factor) => Ok(factor),
        None => Err(LinalgError::NotPositiveDefinite {
            min_eigenvalue: min_eigenvalue(a)?,
        }),
    }
}

/// Square-root factor `F` with `A ≈ F·Fᵀ` of a positive semi-definite matrix.
///
/// Positive definite input yields the Cholesky factor. Singular input
/// (perfectly correlated or zero-volatility assets) yields `V·diag(√λ)`
/// from the eigen-decomposition, with eigenvalues down to
/// `-tol · max(diag)` clipped to zero.
///
/// # Errors
///
/// Returns `LinalgError::NotPositiveDefinite` when the matrix is indefinite
/// beyond tolerance.
pub fn covariance_factor(a: &Matrix, tol: f64) -> Result<Matrix, LinalgError> {
    a.check_symmetric(SYMMETRY_TOLERANCE)?;
    if let Some(factor) = lower_factor(a) {
        return Ok(factor);
    }
    let scale = a
        .diagonal()
        .into_iter()
        .fold(0.0_f64, f64::max)
        .max(f64::MIN_POSITIVE);
    let eigen = eigen_decompose(a)?;
    let min = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if min < -tol * scale || !min.is_finite() {
        return Err(LinalgError::NotPositiveDefinite { min_eigenvalue: min });
    }
    let roots = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
    Ok(Matrix::from(eigen.eigenvectors * DMatrix::from_diagonal(&roots)))
}

fn lower_factor(a: &Matrix) -> Option<Matrix> {
    a.to_dmatrix()
        .cholesky()
        .map(|factor| Matrix::from(factor.l()))
        .filter(Matrix::is_finite)
}

fn eigen_decompose(a: &Matrix) -> Result<SymmetricEigen<f64, nalgebra::Dyn>, LinalgError> {
    a.check_symmetric(SYMMETRY_TOLERANCE)?;
    SymmetricEigen::try_new(
        a.symmetrised().to_dmatrix(),
        f64::EPSILON,
        MAX_EIGEN_ITERATIONS,
    )
    .ok_or(LinalgError::NoConvergence {
        iterations: MAX_EIGEN_ITERATIONS,
    })
}

/// Eigenvalues of a symmetric matrix in ascending order.
///
/// # Errors
///
/// Returns `LinalgError::NotSymmetric` for asymmetric input and
/// `LinalgError::NoConvergence` if the eigen-solver stalls.
pub fn eigenvalues(a: &Matrix) -> Result<Vec<f64>, LinalgError> {
    let mut values: Vec<f64> = eigen_decompose(a)?.eigenvalues.iter().copied().collect();
    values.sort_by(f64::total_cmp);
    Ok(values)
}

/// Smallest eigenvalue of a symmetric matrix.
pub fn min_eigenvalue(a: &Matrix) -> Result<f64, LinalgError> {
    Ok(eigenvalues(a)?.first().copied().unwrap_or(0.0))
}

/// Whether a symmetric matrix is positive semi-definite.
///
/// Eigenvalues down to `-tol · max(1, max|diag|)` are accepted as zero.
///
/// # Examples
///
/// ```
/// use wealth_core::math::{is_positive_semidefinite, Matrix};
///
/// let psd = Matrix::from_rows(vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
/// assert!(is_positive_semidefinite(&psd, 1e-10).unwrap());
///
/// let indefinite = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 1.0]]).unwrap();
/// assert!(!is_positive_semidefinite(&indefinite, 1e-10).unwrap());
/// ```
pub fn is_positive_semidefinite(a: &Matrix, tol: f64) -> Result<bool, LinalgError> {
    let scale = a
        .diagonal()
        .into_iter()
        .map(f64::abs)
        .fold(1.0_f64, f64::max);
    Ok(min_eigenvalue(a)? >= -tol * scale)
}

/// Nearest positive semi-definite matrix by eigenvalue clipping.
///
/// Eigenvalues below `floor` are raised to `floor`; the result is the
/// Frobenius-nearest matrix with spectrum bounded below by `floor`.
pub fn nearest_positive_semidefinite(a: &Matrix, floor: f64) -> Result<Matrix, LinalgError> {
    let mut eigen = eigen_decompose(a)?;
    eigen.eigenvalues.apply(|v| *v = v.max(floor));
    Ok(Matrix::from(eigen.recompose()).symmetrised())
}

/// Solves `A·x = b` by LU decomposition with partial pivoting.
///
/// # Errors
///
/// Returns `LinalgError::Singular` when a pivot vanishes relative to the
/// matrix scale.
pub fn solve(a: &Matrix, b: &[f64]) -> Result<Vec<f64>, LinalgError> {
    let n = require_square(a)?;
    if b.len() != n {
        return Err(LinalgError::DimensionMismatch {
            context: "solve",
            expected: n,
            found: b.len(),
        });
    }
    let lu = a.to_dmatrix().lu();
    check_pivots(&lu.u(), a.max_abs_row_sum())?;
    lu.solve(&DVector::from_column_slice(b))
        .map(|x| x.iter().copied().collect())
        .ok_or(LinalgError::Singular {
            pivot: n.saturating_sub(1),
        })
}

/// Matrix inverse via LU decomposition.
///
/// # Errors
///
/// Same as [`solve`].
pub fn inverse(a: &Matrix) -> Result<Matrix, LinalgError> {
    let n = require_square(a)?;
    let lu = a.to_dmatrix().lu();
    check_pivots(&lu.u(), a.max_abs_row_sum())?;
    lu.try_inverse()
        .map(Matrix::from)
        .ok_or(LinalgError::Singular { pivot: n.saturating_sub(1) })
}

fn require_square(a: &Matrix) -> Result<usize, LinalgError> {
    if a.is_square() {
        Ok(a.rows())
    } else {
        Err(LinalgError::NotSquare {
            rows: a.rows(),
            cols: a.cols(),
        })
    }
}

fn check_pivots(u: &DMatrix<f64>, scale: f64) -> Result<(), LinalgError> {
    let threshold = SINGULAR_PIVOT * scale.max(f64::MIN_POSITIVE);
    match (0..u.nrows().min(u.ncols())).find(|&i| !(u[(i, i)].abs() > threshold)) {
        Some(pivot) => Err(LinalgError::Singular { pivot }),
        None => Ok(()),
    }
}
