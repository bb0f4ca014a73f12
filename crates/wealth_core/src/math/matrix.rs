//! Dense row-major matrix.
//!
//! The serialisable container passed between crates. Products and
//! decompositions convert to `nalgebra::DMatrix` via [`Matrix::to_dmatrix`].

use crate::types::LinalgError;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Dense row-major `f64` matrix.
///
/// # Examples
///
/// ```
/// use wealth_core::math::Matrix;
///
/// let a = Matrix::from_rows(vec![vec![2.0, 0.0], vec![0.0, 3.0]]).unwrap();
/// let y = a.mul_vec(&[1.0, 1.0]).unwrap();
/// assert_eq!(y, vec![2.0, 3.0]);
/// assert_eq!(a.quad_form(&[1.0, 1.0]), 5.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Creates an identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Creates a diagonal matrix.
    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        let n = diagonal.len();
        let mut m = Self::zeros(n, n);
        for (i, d) in diagonal.iter().enumerate() {
            m[(i, i)] = *d;
        }
        m
    }

    /// Builds a matrix from rows.
    ///
    /// # Errors
    ///
    /// Returns `LinalgError::RaggedRows` if rows differ in length and
    /// `LinalgError::NonFinite` for NaN or infinite entries.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, LinalgError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(LinalgError::RaggedRows {
                    row: i,
                    expected: n_cols,
                    found: row.len(),
                });
            }
            if let Some(j) = row.iter().position(|x| !x.is_finite()) {
                return Err(LinalgError::NonFinite { row: i, col: j });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    /// Builds a covariance matrix from volatilities and a correlation matrix.
    pub fn covariance_from_correlation(
        volatilities: &[f64],
        correlation: &Matrix,
    ) -> Result<Self, LinalgError> {
        let n = volatilities.len();
        if correlation.rows != n || correlation.cols != n {
            return Err(LinalgError::DimensionMismatch {
                context: "covariance_from_correlation",
                expected: n,
                found: correlation.rows,
            });
        }
        let mut cov = Self::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                cov[(i, j)] = volatilities[i] * volatilities[j] * correlation[(i, j)];
            }
        }
        Ok(cov)
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the matrix is square.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Row `i` as a slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Diagonal entries.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.rows.min(self.cols)).map(|i| self[(i, i)]).collect()
    }

    /// Rows as nested vectors.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }

    /// Column-major `nalgebra` copy.
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.rows, self.cols, &self.data)
    }

    /// Transpose.
    pub fn transpose(&self) -> Self {
        Self::from(self.to_dmatrix().transpose())
    }

    /// Matrix product `self · other`.
    pub fn mul(&self, other: &Matrix) -> Result<Matrix, LinalgError> {
        if self.cols != other.rows {
            return Err(LinalgError::DimensionMismatch {
                context: "mul",
                expected: self.cols,
                found: other.rows,
            });
        }
        Ok(Self::from(self.to_dmatrix() * other.to_dmatrix()))
    }

    /// Matrix-vector product `self · x`.
    pub fn mul_vec(&self, x: &[f64]) -> Result<Vec<f64>, LinalgError> {
        if x.len() != self.cols {
            return Err(LinalgError::DimensionMismatch {
                context: "mul_vec",
                expected: self.cols,
                found: x.len(),
            });
        }
        Ok((0..self.rows)
            .map(|i| self.row(i).iter().zip(x).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Quadratic form `xᵀ·self·x`.
    ///
    /// The caller guarantees `x.len()` matches the matrix dimension.
    pub fn quad_form(&self, x: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), self.rows);
        let mut total = 0.0;
        for i in 0..self.rows {
            let row = self.row(i);
            let inner: f64 = row.iter().zip(x).map(|(a, b)| a * b).sum();
            total += x[i] * inner;
        }
        total
    }

    /// Element-wise sum.
    pub fn add(&self, other: &Matrix) -> Result<Matrix, LinalgError> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(LinalgError::DimensionMismatch {
                context: "add",
                expected: self.rows * self.cols,
                found: other.rows * other.cols,
            });
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(a, b)| a + b).collect(),
        })
    }

    /// Multiplies every entry by `factor`.
    pub fn scale(&self, factor: f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|x| x * factor).collect(),
        }
    }

    /// Checks symmetry to absolute tolerance `tol`.
    ///
    /// # Errors
    ///
    /// Returns `LinalgError::NotSquare` or `LinalgError::NotSymmetric`.
    pub fn check_symmetric(&self, tol: f64) -> Result<(), LinalgError> {
        if !self.is_square() {
            return Err(LinalgError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        for i in 0..self.rows {
            for j in (i + 1)..self.cols {
                let scale = self[(i, j)].abs().max(self[(j, i)].abs()).max(1.0);
                if (self[(i, j)] - self[(j, i)]).abs() > tol * scale {
                    return Err(LinalgError::NotSymmetric { row: i, col: j });
                }
            }
        }
        Ok(())
    }

    /// Returns `(A + Aᵀ) / 2`.
    pub fn symmetrised(&self) -> Matrix {
        let mut out = self.clone();
        for i in 0..self.rows {
            for j in (i + 1)..self.cols {
                let avg = 0.5 * (self[(i, j)] + self[(j, i)]);
                out[(i, j)] = avg;
                out[(j, i)] = avg;
            }
        }
        out
    }

    /// Largest absolute row sum, an upper bound on the spectral radius.
    pub fn max_abs_row_sum(&self) -> f64 {
        (0..self.rows)
            .map(|i| self.row(i).iter().map(|x| x.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    /// Whether every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl From<DMatrix<f64>> for Matrix {
    fn from(m: DMatrix<f64>) -> Self {
        // the transpose's column-major storage is `m` in row-major order
        let (rows, cols) = m.shape();
        Self {
            rows,
            cols,
            data: m.transpose().as_slice().to_vec(),
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_rows_rejects_ragged() {
        let result = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(LinalgError::RaggedRows { row: 1, .. })));
    }

    #[test]
    fn test_from_rows_rejects_nan() {
        let result = Matrix::from_rows(vec![vec![1.0, f64::NAN]]);
        assert_eq!(result, Err(LinalgError::NonFinite { row: 0, col: 1 }));
    }

    #[test]
    fn test_mul_and_transpose() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let ata = a.transpose().mul(&a).unwrap();
        assert_eq!(ata.rows(), 3);
        assert_relative_eq!(ata[(0, 0)], 17.0);
        assert_relative_eq!(ata[(1, 2)], 36.0);
        assert_relative_eq!(ata[(2, 2)], 45.0);
        assert!(ata.check_symmetric(1e-12).is_ok());
    }

    #[test]
    fn test_dmatrix_conversion_keeps_layout() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let d = a.to_dmatrix();
        assert_eq!(d.shape(), (2, 3));
        assert_eq!(d[(0, 2)], 3.0);
        assert_eq!(d[(1, 0)], 4.0);
        assert_eq!(Matrix::from(d), a);
        assert_eq!(a.transpose().row(2), &[3.0, 6.0]);
    }

    #[test]
    fn test_mul_dimension_mismatch() {
        let a = Matrix::zeros(2, 3);
        assert!(a.mul(&Matrix::zeros(2, 2)).is_err());
        assert!(a.mul_vec(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_covariance_from_correlation() {
        let corr = Matrix::from_rows(vec![vec![1.0, 0.1], vec![0.1, 1.0]]).unwrap();
        let cov = Matrix::covariance_from_correlation(&[0.15, 0.05], &corr).unwrap();
        assert_relative_eq!(cov[(0, 0)], 0.0225, epsilon = 1e-15);
        assert_relative_eq!(cov[(0, 1)], 0.00075, epsilon = 1e-15);
    }

    #[test]
    fn test_symmetrised_and_check() {
        let a = Matrix::from_rows(vec![vec![1.0, 0.2], vec![0.4, 1.0]]).unwrap();
        assert!(a.check_symmetric(1e-12).is_err());
        let s = a.symmetrised();
        assert_relative_eq!(s[(0, 1)], 0.3);
        assert!(s.check_symmetric(1e-12).is_ok());
    }

    #[test]
    fn test_max_abs_row_sum() {
        let a = Matrix::from_rows(vec![vec![1.0, -2.0], vec![0.5, 0.5]]).unwrap();
        assert_relative_eq!(a.max_abs_row_sum(), 3.0);
    }
}
