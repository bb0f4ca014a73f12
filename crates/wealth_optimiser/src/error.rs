//! Optimiser error types.

use thiserror::Error;
use wealth_core::types::LinalgError;

/// Errors raised by portfolio construction.
///
/// `Infeasible` is the recoverable case: the caller holds its current
/// weights and records the fallback. The remaining variants indicate
/// malformed input.
///
/// # Examples
///
/// ```
/// use wealth_optimiser::OptimisationError;
///
/// let err = OptimisationError::infeasible("class bands exceed the budget");
/// assert!(err.is_infeasible());
/// assert_eq!(err.to_string(), "Infeasible constraints: class bands exceed the budget");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimisationError {
    /// No portfolio satisfies every constraint.
    #[error("Infeasible constraints: {reason}")]
    Infeasible {
        /// Which constraints conflict
        reason: String,
    },

    /// Input vectors and matrices disagree in size.
    #[error("Dimension mismatch in {context}: expected {expected}, got {found}")]
    DimensionMismatch {
        /// Where the mismatch was detected
        context: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        found: usize,
    },

    /// A parameter is out of range or not finite.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wrapped linear algebra failure.
    #[error(transparent)]
    Linalg(#[from] LinalgError),
}

impl OptimisationError {
    /// Creates an `Infeasible` error.
    pub fn infeasible(reason: impl Into<String>) -> Self {
        Self::Infeasible {
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidInput` error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Whether the error is recoverable by holding current weights.
    #[inline]
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible { .. })
    }
}
