//! CLI error types.

use thiserror::Error;
use wealth_core::types::{DataError, LinalgError};
use wealth_models::ModelError;
use wealth_risk::RiskError;
use wealth_simulation::SimulationError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// A file could not be parsed.
    #[error("Failed to parse {path}: {reason}")]
    Parse {
        /// File involved
        path: String,
        /// Parser message
        reason: String,
    },

    /// Configuration failed validation.
    #[error("Invalid configuration:\n  - {}", .0.join("\n  - "))]
    Config(Vec<String>),

    /// Command-line argument rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Asset or client record rejected.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Factor covariance could not be built.
    #[error(transparent)]
    Linalg(#[from] LinalgError),

    /// Return model rejected.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Simulation run failed.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Risk analysis failed.
    #[error(transparent)]
    Risk(#[from] RiskError),

    /// Report serialisation failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Wraps an I/O error with the file it concerns.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_lists_every_message() {
        let err = CliError::Config(vec!["first".into(), "second".into()]);
        let text = err.to_string();
        assert!(text.contains("- first"));
        assert!(text.contains("- second"));
    }

    #[test]
    fn test_wraps_library_errors() {
        let err: CliError = RiskError::EmptySample.into();
        assert!(matches!(err, CliError::Risk(_)));
    }
}
