//! Optimisation problem, result and the `optimise` entry point.

use crate::constraints::{
    CandidateAsset, Constraint, ConstraintSet, FeasibleRegion, FEASIBILITY_TOLERANCE,
};
use crate::error::OptimisationError;
use crate::strategy::{OptimisationStrategy, StrategyKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use wealth_core::math::Matrix;

const BINDING_TOLERANCE: f64 = 1e-7;

/// Inputs of one portfolio construction.
///
/// Expected returns and covariance are annual and aligned with `candidates`.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimisationProblem {
    /// Assets that may be held
    pub candidates: Vec<CandidateAsset>,
    /// Annual expected returns (possibly subjective)
    pub expected_returns: Vec<f64>,
    /// Annual covariance
    pub covariance: Matrix,
    /// Constraints
    pub constraints: ConstraintSet,
    /// Weights held before the rebalance
    pub current_weights: Option<Vec<f64>>,
    /// Client risk aversion `λ`, used when the strategy does not fix one
    pub risk_aversion: f64,
}

impl OptimisationProblem {
    /// Creates a problem with risk aversion 1 and no current holdings.
    pub fn new(
        candidates: Vec<CandidateAsset>,
        expected_returns: Vec<f64>,
        covariance: Matrix,
        constraints: ConstraintSet,
    ) -> Self {
        Self {
            candidates,
            expected_returns,
            covariance,
            constraints,
            current_weights: None,
            risk_aversion: 1.0,
        }
    }

    /// Sets the current weights.
    pub fn with_current_weights(mut self, weights: Vec<f64>) -> Self {
        self.current_weights = Some(weights);
        self
    }

    /// Sets the client risk aversion.
    pub fn with_risk_aversion(mut self, risk_aversion: f64) -> Self {
        self.risk_aversion = risk_aversion;
        self
    }

    /// Number of candidate assets.
    #[inline]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether there are no candidates.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Checks shapes and finiteness.
    ///
    /// # Errors
    ///
    /// Returns `OptimisationError::DimensionMismatch` or
    /// `OptimisationError::InvalidInput`.
    pub fn validate(&self) -> Result<(), OptimisationError> {
        let n = self.candidates.len();
        if self.expected_returns.len() != n {
            return Err(OptimisationError::DimensionMismatch {
                context: "expected returns",
                expected: n,
                found: self.expected_returns.len(),
            });
        }
        if self.covariance.rows() != n || self.covariance.cols() != n {
            return Err(OptimisationError::DimensionMismatch {
                context: "covariance",
                expected: n,
                found: self.covariance.rows(),
            });
        }
        if self.expected_returns.iter().any(|x| !x.is_finite()) || !self.covariance.is_finite() {
            return Err(OptimisationError::invalid(
                "expected returns and covariance must be finite",
            ));
        }
        self.covariance.check_symmetric(1e-10)?;
        if !(self.risk_aversion > 0.0) || !self.risk_aversion.is_finite() {
            return Err(OptimisationError::invalid("risk aversion must be positive"));
        }
        if let Some(current) = &self.current_weights {
            if current.iter().any(|x| !x.is_finite()) {
                return Err(OptimisationError::invalid("current weights must be finite"));
            }
        }
        Ok(())
    }

    /// Compiles the constraint set against the candidates.
    pub fn feasible_region(&self) -> Result<FeasibleRegion, OptimisationError> {
        FeasibleRegion::compile(
            &self.candidates,
            &self.constraints,
            self.current_weights.as_deref(),
        )
    }
}

/// Outcome of the solver for one optimisation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Solver reached its tolerance
    Converged {
        /// Iterations used
        iterations: usize,
    },
    /// Solver stopped at its iteration limit; weights are feasible
    IterationLimit {
        /// Iterations used
        iterations: usize,
    },
    /// No optimisation took place; current weights were held
    FallbackUsed {
        /// Why the optimiser could not be used
        reason: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Converged { iterations } => write!(f, "converged in {iterations} iterations"),
            Diagnostic::IterationLimit { iterations } => {
                write!(f, "stopped at the {iterations}-iteration limit")
            }
            Diagnostic::FallbackUsed { reason } => write!(f, "fallback: {reason}"),
        }
    }
}

/// Target weights and solver diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimisationResult {
    /// Target weights aligned with the candidates
    pub weights: Vec<f64>,
    /// Strategy objective at the solution
    pub objective_value: f64,
    /// Inequality constraints active at the solution
    pub binding_constraints: Vec<Constraint>,
    /// Solver status
    pub diagnostic: Diagnostic,
}

impl OptimisationResult {
    /// Result that holds `current` weights after the optimiser failed.
    pub fn fallback(current: Vec<f64>, reason: impl Into<String>) -> Self {
        Self {
            weights: current,
            objective_value: f64::NAN,
            binding_constraints: Vec::new(),
            diagnostic: Diagnostic::FallbackUsed {
                reason: reason.into(),
            },
        }
    }

    /// Whether the result came from a fallback.
    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self.diagnostic, Diagnostic::FallbackUsed { .. })
    }
}

/// Solves `problem` with `strategy`.
///
/// The returned weights satisfy every constraint within
/// [`FEASIBILITY_TOLERANCE`](crate::constraints::FEASIBILITY_TOLERANCE).
///
/// # Errors
///
/// - `OptimisationError::Infeasible` if the constraints admit no portfolio
/// - `OptimisationError::InvalidInput` / `DimensionMismatch` for malformed input
///
/// # Examples
///
/// ```
/// use wealth_core::math::Matrix;
/// use wealth_core::types::AssetClass;
/// use wealth_optimiser::constraints::{CandidateAsset, ClassBand, ConstraintSet};
/// use wealth_optimiser::strategy::StrategyKind;
/// use wealth_optimiser::{optimise, OptimisationProblem};
///
/// let problem = OptimisationProblem::new(
///     vec![
///         CandidateAsset::new("EQ", AssetClass::Equity),
///         CandidateAsset::new("BOND", AssetClass::FixedIncome),
///     ],
///     vec![0.08, 0.03],
///     Matrix::from_rows(vec![vec![0.0225, 0.00075], vec![0.00075, 0.0025]]).unwrap(),
///     ConstraintSet::default().with_class_band(ClassBand::fixed(AssetClass::Equity, 0.6)),
/// );
/// let result = optimise(&problem, &StrategyKind::mean_variance()).unwrap();
/// assert!((result.weights[0] - 0.6).abs() < 1e-6);
/// assert!((result.weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);
/// ```
pub fn optimise(
    problem: &OptimisationProblem,
    strategy: &StrategyKind,
) -> Result<OptimisationResult, OptimisationError> {
    problem.validate()?;
    let region = problem.feasible_region()?;
    check_feasible(&region, &region.starting_point())?;
    let solution = strategy.solve(problem, &region)?;
    check_feasible(&region, &solution.weights)?;

    let objective_value = strategy.objective(problem, &solution.weights);
    let binding_constraints = region.binding(&solution.weights, BINDING_TOLERANCE);
    let diagnostic = if solution.converged {
        Diagnostic::Converged {
            iterations: solution.iterations,
        }
    } else {
        Diagnostic::IterationLimit {
            iterations: solution.iterations,
        }
    };
    debug!(
        strategy = strategy.name(),
        objective = objective_value,
        binding = binding_constraints.len(),
        %diagnostic,
        "Optimisation complete"
    );
    Ok(OptimisationResult {
        weights: solution.weights,
        objective_value,
        binding_constraints,
        diagnostic,
    })
}

fn check_feasible(region: &FeasibleRegion, weights: &[f64]) -> Result<(), OptimisationError> {
    let violations = region.violations(weights, FEASIBILITY_TOLERANCE);
    match violations.iter().max_by(|a, b| a.1.total_cmp(&b.1)) {
        Some((constraint, amount)) => Err(OptimisationError::infeasible(format!(
            "no portfolio satisfies every constraint; closest point breaks the {constraint} by {amount:.3e}"
        ))),
        None => Ok(()),
    }
}
