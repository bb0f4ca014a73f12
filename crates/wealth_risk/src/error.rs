//! Risk analytics error types.

use thiserror::Error;

/// Errors raised while computing risk metrics.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskError {
    /// No successful path to analyse.
    #[error("No paths to analyse")]
    EmptySample,

    /// Confidence level outside (0, 1).
    #[error("Invalid confidence level {0}: must lie strictly between 0 and 1")]
    InvalidConfidenceLevel(f64),

    /// Inputs of inconsistent size.
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// What was being compared
        context: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        found: usize,
    },

    /// A stress scenario names no factor of the model.
    #[error("Stress scenario '{0}' shocks no factor of the model")]
    NoMatchingFactor(String),

    /// Any other invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RiskError {
    /// Checks `level` lies strictly inside (0, 1).
    pub fn check_confidence(level: f64) -> Result<(), RiskError> {
        if level > 0.0 && level < 1.0 {
            Ok(())
        } else {
            Err(RiskError::InvalidConfidenceLevel(level))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_confidence() {
        assert!(RiskError::check_confidence(0.95).is_ok());
        assert_eq!(
            RiskError::check_confidence(1.0),
            Err(RiskError::InvalidConfidenceLevel(1.0))
        );
        assert!(RiskError::check_confidence(f64::NAN).is_err());
    }

    #[test]
    fn test_display() {
        let err = RiskError::NoMatchingFactor("Equity crash".into());
        assert_eq!(
            err.to_string(),
            "Stress scenario 'Equity crash' shocks no factor of the model"
        );
    }
}
