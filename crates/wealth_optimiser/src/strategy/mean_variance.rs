//! Mean-variance frontier point.

use super::OptimisationStrategy;
use crate::constraints::FeasibleRegion;
use crate::error::OptimisationError;
use crate::problem::OptimisationProblem;
use crate::solver::{maximise_utility, portfolio_volatility, quadratic_utility, Solution};
use serde::{Deserialize, Serialize};

const LAMBDA_MIN: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e4;
const BISECTION_STEPS: usize = 60;
const VOLATILITY_TOLERANCE: f64 = 1e-8;

/// Maximises `μᵀw − (λ/2)·wᵀΣw`.
///
/// With a target volatility, `λ` is found by bisection in log-space so
/// that the portfolio volatility matches the target, or comes as close as
/// the constraints allow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanVariance {
    /// Fixed risk aversion; the client's risk aversion when `None`
    pub risk_aversion: Option<f64>,
    /// Target annual volatility
    pub target_volatility: Option<f64>,
}

impl MeanVariance {
    /// Frontier point at `target` annual volatility.
    pub fn with_target_volatility(target: f64) -> Self {
        Self {
            risk_aversion: None,
            target_volatility: Some(target),
        }
    }

    fn lambda(&self, problem: &OptimisationProblem) -> f64 {
        self.risk_aversion.unwrap_or(problem.risk_aversion)
    }

    fn solve_for_target(
        &self,
        problem: &OptimisationProblem,
        region: &FeasibleRegion,
        target: f64,
    ) -> Solution {
        let mu = &problem.expected_returns;
        let cov = &problem.covariance;
        let start = region.starting_point();

        let aggressive = maximise_utility(region, mu, cov, LAMBDA_MIN, &start);
        let conservative = maximise_utility(region, mu, cov, LAMBDA_MAX, &start);
        let mut iterations = aggressive.iterations + conservative.iterations;
        if portfolio_volatility(cov, &aggressive.weights) <= target {
            return Solution {
                iterations,
                ..aggressive
            };
        }
        if portfolio_volatility(cov, &conservative.weights) >= target {
            return Solution {
                iterations,
                ..conservative
            };
        }

        let (mut log_lo, mut log_hi) = (LAMBDA_MIN.ln(), LAMBDA_MAX.ln());
        let mut best = conservative;
        let mut best_gap = f64::INFINITY;
        let mut warm = start;
        for _ in 0..BISECTION_STEPS {
            let log_mid = 0.5 * (log_lo + log_hi);
            let solution = maximise_utility(region, mu, cov, log_mid.exp(), &warm);
            iterations += solution.iterations;
            let vol = portfolio_volatility(cov, &solution.weights);
            let gap = (vol - target).abs();
            // volatility falls as risk aversion rises
            if vol > target {
                log_lo = log_mid;
            } else {
                log_hi = log_mid;
            }
            warm = solution.weights.clone();
            if gap < best_gap {
                best_gap = gap;
                best = solution;
            }
            if gap < VOLATILITY_TOLERANCE {
                break;
            }
        }
        Solution { iterations, ..best }
    }
}

impl OptimisationStrategy for MeanVariance {
    fn name(&self) -> &'static str {
        "mean_variance"
    }

    fn solve(
        &self,
        problem: &OptimisationProblem,
        region: &FeasibleRegion,
    ) -> Result<Solution, OptimisationError> {
        if let Some(target) = self.target_volatility {
            if !(target > 0.0) {
                return Err(OptimisationError::invalid(
                    "target volatility must be positive",
                ));
            }
            return Ok(self.solve_for_target(problem, region, target));
        }
        let lambda = self.lambda(problem);
        if !(lambda > 0.0) {
            return Err(OptimisationError::invalid("risk aversion must be positive"));
        }
        Ok(maximise_utility(
            region,
            &problem.expected_returns,
            &problem.covariance,
            lambda,
            &region.starting_point(),
        ))
    }

    fn objective(&self, problem: &OptimisationProblem, weights: &[f64]) -> f64 {
        quadratic_utility(
            &problem.expected_returns,
            &problem.covariance,
            self.lambda(problem),
            weights,
        )
    }
}
