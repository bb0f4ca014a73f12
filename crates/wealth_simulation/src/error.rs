//! Error types for the path simulator.
//!
//! - `ConfigurationError`: rejected before any simulation work starts
//! - `SimulationError`: fatal to a whole run
//! - `ScenarioError`: confined to one scenario, reported in the outcome

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wealth_core::types::DataError;
use wealth_models::ModelError;
use wealth_optimiser::OptimisationError;

/// Invalid simulation configuration.
///
/// # Examples
///
/// ```
/// use wealth_simulation::ConfigurationError;
///
/// let err = ConfigurationError::InvalidScenarioCount(0);
/// assert!(err.to_string().contains("scenario count 0"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Scenario count outside [1, 1_000_000].
    #[error("Invalid scenario count {0}: must be in range [1, 1_000_000]")]
    InvalidScenarioCount(usize),

    /// Period count outside [1, 1_200].
    #[error("Invalid period count {0}: must be in range [1, 1_200]")]
    InvalidPeriodCount(usize),

    /// Client count outside [1, 100_000].
    #[error("Invalid client count {0}: must be in range [1, 100_000]")]
    InvalidClientCount(usize),

    /// Periods per year must divide into quarters sensibly.
    #[error("Invalid periods per year {0}: must be one of 1, 2, 4, 12, 52, 252")]
    InvalidPeriodsPerYear(usize),

    /// Confidence level outside (0, 1).
    #[error("Invalid confidence level {0}: must lie strictly between 0 and 1")]
    InvalidConfidenceLevel(f64),

    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Description of the problem
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates an `InvalidParameter` error.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl From<OptimisationError> for ConfigurationError {
    fn from(err: OptimisationError) -> Self {
        Self::invalid("constraints", err.to_string())
    }
}

/// Errors that abort a simulation run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Configuration rejected at run start.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Return model could not be built or used.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Client or portfolio record rejected.
    #[error(transparent)]
    Data(#[from] DataError),

    /// The run was cancelled; partial results were discarded.
    #[error("Simulation cancelled after {completed} of {requested} scenarios")]
    Cancelled {
        /// Scenarios finished before cancellation was observed
        completed: usize,
        /// Scenarios requested
        requested: usize,
    },

    /// Input inconsistent with the configured run.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SimulationError {
    /// Creates an `InvalidInput` error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }
}

/// Failure confined to one scenario.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    /// A valuation became NaN or infinite.
    #[error("Non-finite {quantity} at period {period}")]
    NonFinite {
        /// Period at which the value was detected
        period: usize,
        /// Which quantity went bad
        quantity: &'static str,
    },

    /// The optimiser rejected its input for a reason other than infeasibility.
    #[error("Optimiser failed at period {period}: {source}")]
    Optimiser {
        /// Period of the rebalance
        period: usize,
        /// Underlying error
        source: OptimisationError,
    },

    /// The scenario was skipped because the run was cancelled.
    #[error("Cancelled before start")]
    Cancelled,
}

/// A scenario excluded from the results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFailure {
    /// Scenario index
    pub scenario: usize,
    /// Rendered cause
    pub cause: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = ConfigurationError::InvalidConfidenceLevel(1.5);
        assert!(err.to_string().contains("1.5"));

        let err = ConfigurationError::invalid("cash_buffer", "must lie in [0, 1)");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'cash_buffer': must lie in [0, 1)"
        );
    }

    #[test]
    fn test_simulation_error_wraps_configuration() {
        let err: SimulationError = ConfigurationError::InvalidPeriodCount(0).into();
        assert!(matches!(err, SimulationError::Configuration(_)));
        assert!(err.to_string().contains("period count 0"));
    }

    #[test]
    fn test_cancelled_display() {
        let err = SimulationError::Cancelled {
            completed: 10,
            requested: 100,
        };
        assert_eq!(
            err.to_string(),
            "Simulation cancelled after 10 of 100 scenarios"
        );
    }
}
