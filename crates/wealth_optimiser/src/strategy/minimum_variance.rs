//! Minimum-variance portfolio.

use super::OptimisationStrategy;
use crate::constraints::FeasibleRegion;
use crate::error::OptimisationError;
use crate::problem::OptimisationProblem;
use crate::solver::{maximise_utility, Solution};

/// Lowest-variance feasible portfolio; expected returns are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinimumVariance;

impl OptimisationStrategy for MinimumVariance {
    fn name(&self) -> &'static str {
        "minimum_variance"
    }

    fn solve(
        &self,
        problem: &OptimisationProblem,
        region: &FeasibleRegion,
    ) -> Result<Solution, OptimisationError> {
        let zero = vec![0.0; problem.len()];
        Ok(maximise_utility(
            region,
            &zero,
            &problem.covariance,
            1.0,
            &region.starting_point(),
        ))
    }

    /// Portfolio variance.
    fn objective(&self, problem: &OptimisationProblem, weights: &[f64]) -> f64 {
        problem.covariance.quad_form(weights)
    }
}
