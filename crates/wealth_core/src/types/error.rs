//! Error types for structured error handling.
//!
//! This module provides:
//! - `LinalgError`: Errors from dense linear algebra routines
//! - `DataError`: Errors from validating assets, universes and client records

use thiserror::Error;

/// Errors raised by the dense linear algebra routines in [`crate::math`].
///
/// # Examples
///
/// ```
/// use wealth_core::types::LinalgError;
///
/// let err = LinalgError::NotSquare { rows: 2, cols: 3 };
/// assert_eq!(format!("{}", err), "Matrix is not square: 2x3");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    /// Operand shapes are incompatible.
    #[error("Dimension mismatch in {context}: expected {expected}, got {found}")]
    DimensionMismatch {
        /// Operation that detected the mismatch
        context: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        found: usize,
    },

    /// A square matrix was required.
    #[error("Matrix is not square: {rows}x{cols}")]
    NotSquare {
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },

    /// A symmetric matrix was required.
    #[error("Matrix is not symmetric at ({row}, {col})")]
    NotSymmetric {
        /// Row of the first asymmetric entry
        row: usize,
        /// Column of the first asymmetric entry
        col: usize,
    },

    /// Cholesky factorisation failed.
    #[error("Matrix is not positive definite: minimum eigenvalue {min_eigenvalue:.3e}")]
    NotPositiveDefinite {
        /// Smallest eigenvalue of the input
        min_eigenvalue: f64,
    },

    /// Linear system is singular to working precision.
    #[error("Matrix is singular at pivot {pivot}")]
    Singular {
        /// Index of the zero pivot
        pivot: usize,
    },

    /// An iterative routine did not converge.
    #[error("Failed to converge after {iterations} iterations")]
    NoConvergence {
        /// Iterations performed
        iterations: usize,
    },

    /// Rows of different lengths were supplied.
    #[error("Ragged input: row {row} has length {found}, expected {expected}")]
    RaggedRows {
        /// Offending row
        row: usize,
        /// Expected row length
        expected: usize,
        /// Actual row length
        found: usize,
    },

    /// A NaN or infinite entry was encountered.
    #[error("Non-finite entry at ({row}, {col})")]
    NonFinite {
        /// Row of the entry
        row: usize,
        /// Column of the entry
        col: usize,
    },
}

/// Errors raised when validating domain records.
///
/// # Examples
///
/// ```
/// use wealth_core::types::DataError;
///
/// let err = DataError::invalid_asset("EQ", "volatility must be non-negative");
/// assert!(format!("{}", err).contains("EQ"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// Asset record failed validation.
    #[error("Invalid asset '{id}': {reason}")]
    InvalidAsset {
        /// Asset identifier
        id: String,
        /// Description of the problem
        reason: String,
    },

    /// Client record failed validation.
    #[error("Invalid client '{id}': {reason}")]
    InvalidClient {
        /// Client identifier
        id: String,
        /// Description of the problem
        reason: String,
    },

    /// The same asset identifier appears twice in a universe.
    #[error("Duplicate asset identifier: {0}")]
    DuplicateAsset(String),

    /// An identifier does not resolve against the universe.
    #[error("Unknown asset identifier: {0}")]
    UnknownAsset(String),

    /// A universe must contain at least one asset.
    #[error("Asset universe is empty")]
    EmptyUniverse,
}

impl DataError {
    /// Creates an `InvalidAsset` error.
    pub fn invalid_asset(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAsset {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidClient` error.
    pub fn invalid_client(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClient {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linalg_error_display() {
        let err = LinalgError::NotPositiveDefinite {
            min_eigenvalue: -0.5,
        };
        assert!(err.to_string().contains("-5.000e-1"));

        let err = LinalgError::DimensionMismatch {
            context: "mul_vec",
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in mul_vec: expected 3, got 2"
        );
    }

    #[test]
    fn test_data_error_helpers() {
        let err = DataError::invalid_client("C1", "risk tolerance outside [0, 10]");
        assert!(matches!(err, DataError::InvalidClient { .. }));
        assert!(err.to_string().contains("C1"));
    }
}
