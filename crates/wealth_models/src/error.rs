//! Model-layer error types.

use thiserror::Error;
use wealth_core::types::{DataError, LinalgError};

/// Errors raised while building or sampling the return model.
///
/// Every variant is fatal to a simulation run: a model that cannot be
/// trusted must not produce scenarios.
///
/// # Examples
///
/// ```
/// use wealth_models::ModelError;
///
/// let err = ModelError::NotPositiveSemiDefinite {
///     context: "factor covariance",
///     min_eigenvalue: -0.02,
/// };
/// assert!(err.to_string().contains("not positive semi-definite"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A covariance matrix has a materially negative eigenvalue.
    #[error("{context} is not positive semi-definite: minimum eigenvalue {min_eigenvalue:.3e}")]
    NotPositiveSemiDefinite {
        /// Which matrix failed
        context: &'static str,
        /// Most negative eigenvalue found
        min_eigenvalue: f64,
    },

    /// Factor data required by an asset is missing.
    #[error("Missing factor data: {0}")]
    MissingFactorData(String),

    /// Input shapes do not agree.
    #[error("Dimension mismatch in {context}: expected {expected}, got {found}")]
    DimensionMismatch {
        /// Where the mismatch was detected
        context: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        found: usize,
    },

    /// A model parameter is out of range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Description of the problem
        reason: String,
    },

    /// Wrapped linear algebra failure.
    #[error(transparent)]
    Linalg(#[from] LinalgError),

    /// Wrapped data validation failure.
    #[error(transparent)]
    Data(#[from] DataError),
}

impl ModelError {
    /// Creates an `InvalidParameter` error.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_linalg() {
        let err: ModelError = LinalgError::Singular { pivot: 0 }.into();
        assert!(matches!(err, ModelError::Linalg(_)));
    }

    #[test]
    fn test_invalid_helper() {
        let err = ModelError::invalid("periods_per_year", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'periods_per_year': must be positive"
        );
    }
}
